//! Upstream document shapes and their normalization into templates.
//!
//! The documents mirror the subset of the public species/move API the engine
//! reads. Anything not listed here is ignored on deserialization.

use crate::errors::{TemplateError, TemplateResult};
use schema::{
    BaseStats, BodySize, ElementalType, Evolution, MoveCategory, MoveEffects, MoveTemplate,
    TacticalProfile,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const LEVEL_UP_METHOD: &str = "level-up";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub type_: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: u16,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionGroupDetail {
    pub level_learned_at: u8,
    pub move_learn_method: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    #[serde(rename = "move")]
    pub move_: NamedResource,
    pub version_group_details: Vec<VersionGroupDetail>,
}

impl MoveEntry {
    /// Level the move is learned at, if it is learned by level-up at all.
    /// A recorded level of 0 means "on capture" and counts as level 1.
    pub fn level_up_level(&self) -> Option<u8> {
        self.version_group_details
            .iter()
            .find(|detail| detail.move_learn_method.name == LEVEL_UP_METHOD)
            .map(|detail| detail.level_learned_at.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesDocument {
    pub id: u32,
    pub name: String,
    pub types: Vec<TypeSlot>,
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default)]
    pub height: u32, // decimetres
    #[serde(default)]
    pub weight: u32, // hectograms
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDocument {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: NamedResource,
    pub damage_class: NamedResource,
    pub power: Option<u16>,
    pub accuracy: Option<u8>,
    pub pp: u8,
    #[serde(default)]
    pub priority: i8,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionDetail {
    pub min_level: Option<u8>,
    pub trigger: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionChainDocument {
    pub chain: ChainLink,
}

impl SpeciesDocument {
    /// Pick the six base stats out of the named stat list.
    pub fn base_stats(&self) -> TemplateResult<BaseStats> {
        Ok(BaseStats {
            hp: self.stat("hp")?,
            attack: self.stat("attack")?,
            defense: self.stat("defense")?,
            sp_attack: self.stat("special-attack")?,
            sp_defense: self.stat("special-defense")?,
            speed: self.stat("speed")?,
        })
    }

    fn stat(&self, name: &str) -> TemplateResult<u8> {
        let entry = self
            .stats
            .iter()
            .find(|entry| entry.stat.name == name)
            .ok_or_else(|| self.malformed(format!("missing base stat '{}'", name)))?;
        u8::try_from(entry.base_stat).map_err(|_| {
            self.malformed(format!("base stat '{}' out of range: {}", name, entry.base_stat))
        })
    }

    /// Elemental types ordered by slot.
    pub fn elemental_types(&self) -> TemplateResult<Vec<ElementalType>> {
        let mut slots = self.types.clone();
        slots.sort_by_key(|slot| slot.slot);
        let types = slots
            .iter()
            .map(|slot| {
                ElementalType::from_str(&slot.type_.name)
                    .map_err(|_| self.malformed(format!("unknown type '{}'", slot.type_.name)))
            })
            .collect::<TemplateResult<Vec<_>>>()?;
        if types.is_empty() || types.len() > 2 {
            return Err(self.malformed(format!("expected 1 or 2 types, got {}", types.len())));
        }
        Ok(types)
    }

    /// Moves learned by level-up, with their learn level, in document order.
    pub fn level_up_moves(&self) -> Vec<(&str, u8)> {
        self.moves
            .iter()
            .filter_map(|entry| {
                entry
                    .level_up_level()
                    .map(|level| (entry.move_.name.as_str(), level))
            })
            .collect()
    }

    pub fn body_size(&self) -> BodySize {
        BodySize {
            height: self.height as f32 / 10.0,
            weight: self.weight as f32 / 10.0,
        }
    }

    fn malformed(&self, details: String) -> TemplateError {
        TemplateError::Malformed {
            identifier: self.name.clone(),
            details,
        }
    }
}

impl MoveDocument {
    /// Convert to a move template with adjacent single-target tactics.
    pub fn to_template(&self) -> TemplateResult<MoveTemplate> {
        let elemental_type = ElementalType::from_str(&self.type_.name).map_err(|_| {
            TemplateError::Malformed {
                identifier: self.name.clone(),
                details: format!("unknown type '{}'", self.type_.name),
            }
        })?;
        let category = match self.damage_class.name.as_str() {
            "physical" => MoveCategory::Physical,
            "special" => MoveCategory::Special,
            "status" => MoveCategory::Status,
            other => {
                return Err(TemplateError::Malformed {
                    identifier: self.name.clone(),
                    details: format!("unknown damage class '{}'", other),
                })
            }
        };

        Ok(MoveTemplate {
            id: self.id.to_string(),
            name: self.name.clone(),
            elemental_type,
            category,
            base_power: self.power.unwrap_or(0),
            accuracy: self.accuracy.unwrap_or(100),
            pp: self.pp,
            priority: self.priority,
            tactical: TacticalProfile::default(),
            effects: MoveEffects::default(),
            description: self
                .effect_entries
                .first()
                .map(|entry| entry.effect.clone())
                .unwrap_or_default(),
        })
    }
}

impl ChainLink {
    /// The level-up evolution of `species_name`, one step deep.
    pub fn find_evolution(&self, species_name: &str) -> Option<Evolution> {
        if self.species.name == species_name {
            let next = self.evolves_to.first()?;
            let details = next.evolution_details.first()?;
            if details.trigger.name != LEVEL_UP_METHOD {
                return None;
            }
            return Some(Evolution {
                level: details.min_level?,
                evolves_into: next.species.name.clone(),
            });
        }

        self.evolves_to
            .iter()
            .find_map(|link| link.find_evolution(species_name))
    }
}
