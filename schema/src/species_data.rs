use crate::{ElementalType, MoveTemplate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u8,
    pub attack: u8,
    pub defense: u8,
    pub sp_attack: u8,
    pub sp_defense: u8,
    pub speed: u8,
}

impl BaseStats {
    pub fn total(&self) -> u16 {
        self.hp as u16
            + self.attack as u16
            + self.defense as u16
            + self.sp_attack as u16
            + self.sp_defense as u16
            + self.speed as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnMethod {
    LevelUp,
    Tutor,
    Tm,
}

/// A move a species picks up naturally, with the level it is learned at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnableMove {
    pub move_: MoveTemplate,
    pub level_learned: u8,
    pub method: LearnMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    pub level: u8,
    pub evolves_into: String, // Template id
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySize {
    pub height: f32, // metres
    pub weight: f32, // kilograms
}

/// Static species data. Never mutated once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTemplate {
    pub id: String,
    pub name: String,
    pub types: Vec<ElementalType>,
    pub base_stats: BaseStats,
    pub natural_moves: Vec<LearnableMove>,
    pub evolution: Option<Evolution>,
    pub size: BodySize,
    pub recruit_difficulty: f32,
}

impl SpeciesTemplate {
    pub fn has_type(&self, elemental_type: ElementalType) -> bool {
        self.types.contains(&elemental_type)
    }

    /// Natural moves learned at exactly `level`, in template order.
    pub fn moves_learned_at(&self, level: u8) -> impl Iterator<Item = &LearnableMove> {
        self.natural_moves
            .iter()
            .filter(move |learnable| learnable.level_learned == level)
    }

    /// The last `limit` natural moves available at `level`, in template order.
    pub fn moves_known_at(&self, level: u8, limit: usize) -> Vec<&LearnableMove> {
        let available: Vec<&LearnableMove> = self
            .natural_moves
            .iter()
            .filter(|learnable| learnable.level_learned <= level)
            .collect();
        let skip = available.len().saturating_sub(limit);
        available.into_iter().skip(skip).collect()
    }
}
