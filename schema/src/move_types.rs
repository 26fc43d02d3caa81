use crate::ElementalType;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusKind {
    Burn,
    Paralysis,
    Sleep,
    Poison,
    #[strum(serialize = "freeze")]
    Frozen,
}

/// Inclusive Manhattan distance band a move can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBounds {
    pub min: u32,
    pub max: u32,
}

impl RangeBounds {
    pub fn contains(&self, distance: u32) -> bool {
        distance >= self.min && distance <= self.max
    }
}

/// Shape used to expand one aimed position into the set of affected tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaOfEffect {
    Single,
    /// Needs a direction, taken from the user's position.
    Line { length: u32 },
    Cross { size: u32 },
    Square { size: u32 },
    Diamond { size: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingRules {
    pub affects_empty: bool,
    pub affects_allies: bool,
    pub affects_self: bool,
    pub requires_line_of_sight: bool,
    pub can_overwrite_status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalProfile {
    pub range: RangeBounds,
    pub area_of_effect: AreaOfEffect,
    pub targeting: TargetingRules,
}

impl Default for TacticalProfile {
    /// Adjacent, single-target, enemies only.
    fn default() -> Self {
        Self {
            range: RangeBounds { min: 1, max: 1 },
            area_of_effect: AreaOfEffect::Single,
            targeting: TargetingRules {
                affects_empty: false,
                affects_allies: false,
                affects_self: false,
                requires_line_of_sight: true,
                can_overwrite_status: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfliction {
    pub kind: StatusKind,
    /// Percentage, 0..=100.
    pub chance: u8,
    /// Turns the status lasts once applied.
    pub duration: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEffects {
    pub status: Option<StatusInfliction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveTemplate {
    pub id: String,
    pub name: String,
    pub elemental_type: ElementalType,
    pub category: MoveCategory,
    pub base_power: u16,
    pub accuracy: u8,
    pub pp: u8,
    pub priority: i8,
    pub tactical: TacticalProfile,
    #[serde(default)]
    pub effects: MoveEffects,
    #[serde(default)]
    pub description: String,
}

impl MoveTemplate {
    pub fn is_status(&self) -> bool {
        self.category == MoveCategory::Status
    }
}
