use crate::battle::state::TurnRng;
use crate::config::BattleConfig;
use crate::species::TemplateLookup;
use crate::unit::{StatusEffect, Unit, UnitId};
use schema::{ElementalType, MoveCategory, MoveTemplate};
use std::sync::Arc;

/// What one move did to one target.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub target: UnitId,
    pub damage: u32,
    pub applied_statuses: Vec<StatusEffect>,
}

/// Core damage formula, before any rounding:
///
/// `((2*level/5 + 2) * power * atk / def / 50 + 2) * stab * effectiveness * roll`
///
/// Defense is floored at 1. The result is floored and never negative.
pub fn damage_formula(
    level: u8,
    power: u16,
    attack: u16,
    defense: u16,
    stab: f64,
    effectiveness: f64,
    random_factor: f64,
) -> u32 {
    let level = level as f64;
    let base = (2.0 * level / 5.0 + 2.0) * power as f64 * attack as f64
        / defense.max(1) as f64
        / 50.0
        + 2.0;
    let damage = base * stab * effectiveness * random_factor;
    damage.max(0.0).floor() as u32
}

/// Scales a 1..=100 roll onto `[min, 1.0]`.
///
/// The factor is quantized: a roll can produce only 100 distinct values,
/// spaced `(1.0 - min) / 99` apart (about 0.0015 at the default 0.85).
pub fn random_factor(roll: u8, min: f64) -> f64 {
    let roll = roll.clamp(1, 100) as f64;
    min + (1.0 - min) * (roll - 1.0) / 99.0
}

/// Damage and status resolution for moves that have already been validated.
pub struct MoveResolver {
    templates: Arc<dyn TemplateLookup>,
    stab_multiplier: f64,
    random_factor_min: f64,
}

impl MoveResolver {
    pub fn new(templates: Arc<dyn TemplateLookup>, config: &BattleConfig) -> Self {
        Self {
            templates,
            stab_multiplier: config.stab_multiplier,
            random_factor_min: config.random_factor_min,
        }
    }

    fn types_of(&self, unit: &Unit) -> Vec<ElementalType> {
        self.templates
            .template(&unit.template_id)
            .map(|template| template.types.clone())
            .unwrap_or_default()
    }

    /// Product of the move type's multiplier against each of the target's types.
    /// A target without a template takes neutral damage.
    pub fn type_effectiveness(&self, move_type: ElementalType, target: &Unit) -> f64 {
        move_type.effectiveness_against(&self.types_of(target)) as f64
    }

    pub fn stab(&self, move_type: ElementalType, attacker: &Unit) -> f64 {
        if self.types_of(attacker).contains(&move_type) {
            self.stab_multiplier
        } else {
            1.0
        }
    }

    /// Damage the move would deal. Status moves deal nothing and do not roll.
    pub fn calculate_damage(
        &self,
        move_template: &MoveTemplate,
        attacker: &Unit,
        target: &Unit,
        rng: &mut TurnRng,
    ) -> u32 {
        let (attack, defense) = match move_template.category {
            MoveCategory::Physical => (attacker.current_stats.attack, target.current_stats.defense),
            MoveCategory::Special => (
                attacker.current_stats.sp_attack,
                target.current_stats.sp_defense,
            ),
            MoveCategory::Status => return 0,
        };

        let roll = rng.next_outcome("damage roll");
        damage_formula(
            attacker.level,
            move_template.base_power,
            attack,
            defense,
            self.stab(move_template.elemental_type, attacker),
            self.type_effectiveness(move_template.elemental_type, target),
            random_factor(roll, self.random_factor_min),
        )
    }

    /// Damage for each target, then an independent status roll per target.
    pub fn resolve_move_effects(
        &self,
        move_template: &MoveTemplate,
        user: &Unit,
        targets: &[&Unit],
        rng: &mut TurnRng,
    ) -> Vec<MoveOutcome> {
        targets
            .iter()
            .map(|target| {
                let damage = self.calculate_damage(move_template, user, target, rng);
                let mut applied_statuses = Vec::new();
                if let Some(infliction) = move_template.effects.status {
                    if rng.next_outcome("status chance") <= infliction.chance {
                        applied_statuses.push(StatusEffect::new(infliction.kind, infliction.duration));
                    }
                }
                MoveOutcome {
                    target: target.id,
                    damage,
                    applied_statuses,
                }
            })
            .collect()
    }
}
