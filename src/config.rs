//! Balance and rules configuration.
//!
//! Values are read from RON, the same format the species and team data use.
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```ron
//! (
//!     movement_speed_divisor: 35,
//!     learn_moves_on_level_up: true,
//! )
//! ```

use crate::errors::ConfigError;
use schema::TeamId;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Base speed is divided by this to get movement range.
    pub movement_speed_divisor: u32,
    /// Flat movement added to every unit.
    pub movement_base_bonus: u32,
    /// Same-type attack bonus.
    pub stab_multiplier: f64,
    /// Lower bound of the damage roll, upper bound is 1.0.
    pub random_factor_min: f64,
    pub max_level: u8,
    pub max_known_moves: usize,
    /// Add moves reached on level-up to the unit instead of only announcing them.
    pub learn_moves_on_level_up: bool,
    /// Side whose fainted units stay on the board.
    pub player_team: TeamId,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            movement_speed_divisor: 20,
            movement_base_bonus: 2,
            stab_multiplier: 1.5,
            random_factor_min: 0.85,
            max_level: 100,
            max_known_moves: 4,
            learn_moves_on_level_up: false,
            player_team: TeamId::Team1,
        }
    }
}

impl BattleConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.movement_speed_divisor == 0 {
            return Err(ConfigError::Invalid(
                "movement_speed_divisor must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.random_factor_min) {
            return Err(ConfigError::Invalid(format!(
                "random_factor_min must be within 0..=1, got {}",
                self.random_factor_min
            )));
        }
        if self.max_level == 0 {
            return Err(ConfigError::Invalid("max_level must be positive".to_string()));
        }
        Ok(())
    }
}
