use crate::config::BattleConfig;
use crate::unit::{calculate_stats, MoveInstance, Unit};
use schema::{MoveTemplate, SpeciesTemplate};

/// A natural move that became available on reaching `level`.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveUnlock {
    pub level: u8,
    pub move_: MoveTemplate,
    /// Whether the move was added to the unit's move list.
    pub learned: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelUpReport {
    pub previous_level: u8,
    /// Every level reached, in order.
    pub levels_reached: Vec<u8>,
    pub unlocked_moves: Vec<MoveUnlock>,
}

impl LevelUpReport {
    pub fn levels_gained(&self) -> usize {
        self.levels_reached.len()
    }
}

/// Add `gained` experience and level the unit up as far as it goes.
///
/// Each level costs the current level in experience. Max stats are
/// recomputed at the final level; current HP is kept as-is and the other
/// current stats follow the new maximums.
pub fn process_experience_gain(
    unit: &mut Unit,
    gained: u32,
    template: &SpeciesTemplate,
    config: &BattleConfig,
) -> LevelUpReport {
    let mut report = LevelUpReport {
        previous_level: unit.level,
        ..LevelUpReport::default()
    };
    unit.experience = unit.experience.saturating_add(gained);

    while unit.level < config.max_level && unit.experience >= unit.level as u32 {
        unit.experience -= unit.level as u32;
        unit.level += 1;
        report.levels_reached.push(unit.level);

        for learnable in template.moves_learned_at(unit.level) {
            let learned = config.learn_moves_on_level_up
                && learn_move(unit, &learnable.move_, config.max_known_moves);
            report.unlocked_moves.push(MoveUnlock {
                level: unit.level,
                move_: learnable.move_.clone(),
                learned,
            });
        }
    }

    if !report.levels_reached.is_empty() {
        let hp = unit.current_stats.hp;
        unit.max_stats = calculate_stats(&template.base_stats, unit.level);
        unit.current_stats = unit.max_stats;
        unit.current_stats.hp = hp.min(unit.max_stats.hp);
    }

    report
}

/// Append a move, forgetting the oldest one past `limit`. Known moves are skipped.
fn learn_move(unit: &mut Unit, template: &MoveTemplate, limit: usize) -> bool {
    if unit.moves.iter().any(|known| known.template.id == template.id) {
        return false;
    }
    unit.moves.push(MoveInstance::new(template.clone()));
    if unit.moves.len() > limit {
        let excess = unit.moves.len() - limit;
        unit.moves.drain(..excess);
    }
    true
}
