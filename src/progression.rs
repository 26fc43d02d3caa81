pub mod evolution;
pub mod leveling;

pub use evolution::evolution_reached;
pub use leveling::{process_experience_gain, LevelUpReport, MoveUnlock};

use crate::unit::Unit;

/// Experience awarded for knocking out `fainted`.
pub fn experience_for_defeat(fainted: &Unit) -> u32 {
    fainted.level as u32
}
