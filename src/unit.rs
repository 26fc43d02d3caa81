use schema::{BaseStats, Direction, MoveTemplate, Position, StatusKind, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub Uuid);

impl UnitId {
    pub fn new_random() -> Self {
        UnitId(Uuid::new_v4())
    }

    /// Stable ids for fixtures and replays.
    pub const fn from_u128(value: u128) -> Self {
        UnitId(Uuid::from_u128(value))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Level-scaled stats. Current and max stats share this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub sp_attack: u16,
    pub sp_defense: u16,
    pub speed: u16,
}

/// Scale base stats to a level.
///
/// HP = floor(2 * Base * Level / 100) + Level + 10
/// Other = floor(2 * Base * Level / 100) + 5
pub fn calculate_stats(base_stats: &BaseStats, level: u8) -> Stats {
    let level = level as u32;
    let scale = |base: u8| (2 * base as u32 * level) / 100;
    let clamp = |value: u32| value.min(u16::MAX as u32) as u16;

    Stats {
        hp: clamp(scale(base_stats.hp) + level + 10),
        attack: clamp(scale(base_stats.attack) + 5),
        defense: clamp(scale(base_stats.defense) + 5),
        sp_attack: clamp(scale(base_stats.sp_attack) + 5),
        sp_defense: clamp(scale(base_stats.sp_defense) + 5),
        speed: clamp(scale(base_stats.speed) + 5),
    }
}

/// Signed adjustments a status may carry. Not yet applied to combat math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatModifier {
    pub attack: i16,
    pub defense: i16,
    pub sp_attack: i16,
    pub sp_defense: i16,
    pub speed: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Remaining turns of the afflicted unit's side.
    pub duration: u8,
    pub modifier: Option<StatModifier>,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration: u8) -> Self {
        Self {
            kind,
            duration,
            modifier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInstance {
    pub template: MoveTemplate,
    pub current_pp: u8,
    pub disabled: bool,
}

impl MoveInstance {
    /// Create a new move instance with max PP
    pub fn new(template: MoveTemplate) -> Self {
        let current_pp = template.pp;
        MoveInstance {
            template,
            current_pp,
            disabled: false,
        }
    }

    pub fn max_pp(&self) -> u8 {
        self.template.pp
    }

    /// Use the move (decrease PP)
    pub fn use_move(&mut self) -> bool {
        if self.current_pp > 0 {
            self.current_pp -= 1;
            true
        } else {
            false
        }
    }
}

/// A battle-ready creature placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub template_id: String,
    pub name: String, // Species name if no nickname
    pub nickname: Option<String>,
    pub level: u8,
    pub experience: u32,
    pub current_stats: Stats,
    pub max_stats: Stats,
    pub moves: Vec<MoveInstance>,
    pub status: Option<StatusEffect>,
    pub position: Position,
    pub facing: Direction,
    pub team: Option<TeamId>,
    pub is_leader: bool,
    pub has_moved: bool,
    pub has_attacked: bool,
    pub is_fainted: bool,
}

impl Unit {
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    pub fn current_hp(&self) -> u16 {
        self.current_stats.hp
    }

    /// Both actions spent for this turn.
    pub fn is_exhausted(&self) -> bool {
        self.has_moved && self.has_attacked
    }

    pub fn can_act(&self) -> bool {
        !self.is_fainted && !self.is_exhausted()
    }

    pub fn is_ally_of(&self, other: &Unit) -> bool {
        self.team == other.team
    }

    /// Apply damage, never dropping below zero. Returns true if the unit fainted.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        let amount = amount.min(u16::MAX as u32) as u16;
        self.current_stats.hp = self.current_stats.hp.saturating_sub(amount);
        if self.current_stats.hp == 0 {
            self.is_fainted = true;
        }
        self.is_fainted
    }

    pub fn move_slot(&self, slot: usize) -> Option<&MoveInstance> {
        self.moves.get(slot)
    }
}
