use crate::battle::state::{BattleEvent, EventBus, GameState, Phase};
use crate::config::BattleConfig;
use crate::errors::InvariantViolation;
use crate::progression::{evolution_reached, process_experience_gain};
use crate::species::TemplateLookup;
use crate::unit::{StatusEffect, Unit, UnitId};
use schema::{Direction, Position, TeamId};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Atomic commands representing final state changes
#[derive(Debug, Clone)]
pub enum BattleCommand {
    // Selection
    SelectUnit {
        unit: UnitId,
        reachable: BTreeSet<Position>,
    },
    ClearSelection,
    SelectMove {
        slot: usize,
        targets: BTreeSet<Position>,
    },
    ClearMoveSelection,

    // Unit modifications
    MoveUnit {
        unit: UnitId,
        to: Position,
    },
    SpendAttack {
        unit: UnitId,
        slot: usize,
        facing: Option<Direction>,
    },
    DealDamage {
        target: UnitId,
        amount: u32,
    },
    ApplyStatus {
        target: UnitId,
        status: StatusEffect,
    },
    AwardExperience {
        unit: UnitId,
        amount: u32,
        defeated: String,
    },
    RemoveUnit {
        unit: UnitId,
    },
    PlaceUnits(Vec<Unit>),

    // Turn flow
    ResetActions,
    TickStatuses {
        team: TeamId,
    },
    SetTurn(TeamId),

    // Notifications
    AddNotification {
        prefix: &'static str,
        message: String,
    },
    DismissNotification(String),

    EmitEvent(BattleEvent),
}

/// Read-only services some commands need while executing.
pub struct CommandContext<'a> {
    pub templates: &'a dyn TemplateLookup,
    pub config: &'a BattleConfig,
}

/// Execute a batch of commands in order, stopping at the first violation.
pub fn execute_command_batch(
    commands: Vec<BattleCommand>,
    state: &mut GameState,
    bus: &mut EventBus,
    ctx: &CommandContext<'_>,
) -> Result<(), InvariantViolation> {
    for command in commands {
        execute_command(command, state, bus, ctx)?;
    }
    Ok(())
}

fn unit_mut(state: &mut GameState, id: UnitId) -> Result<&mut Unit, InvariantViolation> {
    state
        .units
        .get_mut(&id)
        .ok_or(InvariantViolation::UnknownUnit(id))
}

fn ensure_in_bounds(state: &GameState, position: Position) -> Result<(), InvariantViolation> {
    if state.map.contains(position) {
        Ok(())
    } else {
        Err(InvariantViolation::OutOfBounds {
            position,
            width: state.map.width(),
            height: state.map.height(),
        })
    }
}

fn execute_command(
    command: BattleCommand,
    state: &mut GameState,
    bus: &mut EventBus,
    ctx: &CommandContext<'_>,
) -> Result<(), InvariantViolation> {
    match command {
        BattleCommand::SelectUnit { unit, reachable } => {
            if !state.units.contains_key(&unit) {
                return Err(InvariantViolation::UnknownUnit(unit));
            }
            bus.push(BattleEvent::UnitSelected {
                unit,
                reachable: reachable.len(),
            });
            state.selected_unit = Some(unit);
            state.selected_move = None;
            state.valid_moves = reachable;
            state.valid_targets.clear();
            state.phase = Phase::Movement;
            Ok(())
        }
        BattleCommand::ClearSelection => {
            state.selected_unit = None;
            state.selected_move = None;
            state.valid_moves.clear();
            state.valid_targets.clear();
            state.phase = Phase::Movement;
            bus.push(BattleEvent::SelectionCleared);
            Ok(())
        }
        BattleCommand::SelectMove { slot, targets } => {
            let Some(unit) = state.selected_unit else {
                return Ok(());
            };
            bus.push(BattleEvent::MoveSelected {
                unit,
                slot,
                targets: targets.len(),
            });
            state.selected_move = Some(slot);
            state.valid_targets = targets;
            state.phase = Phase::Combat;
            Ok(())
        }
        BattleCommand::ClearMoveSelection => {
            state.selected_move = None;
            state.valid_targets.clear();
            state.phase = Phase::Movement;
            Ok(())
        }
        BattleCommand::MoveUnit { unit, to } => execute_move_unit(unit, to, state, bus),
        BattleCommand::SpendAttack {
            unit,
            slot,
            facing,
        } => {
            let attacker = unit_mut(state, unit)?;
            let move_instance = attacker
                .moves
                .get_mut(slot)
                .ok_or(InvariantViolation::InvalidMoveSlot { unit, slot })?;
            move_instance.use_move();
            attacker.has_attacked = true;
            if let Some(direction) = facing {
                attacker.facing = direction;
            }
            Ok(())
        }
        BattleCommand::DealDamage { target, amount } => {
            execute_deal_damage(target, amount, state, bus)
        }
        BattleCommand::ApplyStatus { target, status } => {
            let unit = unit_mut(state, target)?;
            unit.status = Some(status);
            let message = format!("{} is now affected by {}", unit.display_name(), status.kind);
            state.push_notification("status", message);
            bus.push(BattleEvent::StatusApplied {
                unit: target,
                status: status.kind,
            });
            Ok(())
        }
        BattleCommand::AwardExperience {
            unit,
            amount,
            defeated,
        } => execute_award_experience(unit, amount, &defeated, state, bus, ctx),
        BattleCommand::RemoveUnit { unit } => {
            if state.units.remove(&unit).is_none() {
                return Err(InvariantViolation::UnknownUnit(unit));
            }
            if state.selected_unit == Some(unit) {
                state.selected_unit = None;
                state.selected_move = None;
                state.valid_moves.clear();
                state.valid_targets.clear();
            }
            bus.push(BattleEvent::UnitRemoved { unit });
            Ok(())
        }
        BattleCommand::PlaceUnits(units) => execute_place_units(units, state, bus),
        BattleCommand::ResetActions => {
            for unit in state.units.values_mut() {
                unit.has_moved = false;
                unit.has_attacked = false;
            }
            Ok(())
        }
        BattleCommand::TickStatuses { team } => {
            execute_tick_statuses(team, state, bus);
            Ok(())
        }
        BattleCommand::SetTurn(team) => {
            info!(%team, "turn passes");
            state.current_turn = team;
            Ok(())
        }
        BattleCommand::AddNotification { prefix, message } => {
            state.push_notification(prefix, message);
            Ok(())
        }
        BattleCommand::DismissNotification(id) => {
            state.notifications.retain(|notification| notification.id != id);
            Ok(())
        }
        BattleCommand::EmitEvent(event) => {
            bus.push(event);
            Ok(())
        }
    }
}

fn execute_move_unit(
    unit: UnitId,
    to: Position,
    state: &mut GameState,
    bus: &mut EventBus,
) -> Result<(), InvariantViolation> {
    ensure_in_bounds(state, to)?;
    if let Some(occupant) = state
        .units
        .values()
        .find(|other| other.position == to && other.id != unit)
    {
        return Err(InvariantViolation::TileOccupied {
            position: to,
            occupant: occupant.id,
            incoming: unit,
        });
    }

    let mover = unit_mut(state, unit)?;
    let from = mover.position;
    if let Some(direction) = Direction::toward(from, to) {
        mover.facing = direction;
    }
    mover.position = to;
    mover.has_moved = true;
    bus.push(BattleEvent::UnitMoved { unit, from, to });
    Ok(())
}

fn execute_deal_damage(
    target: UnitId,
    amount: u32,
    state: &mut GameState,
    bus: &mut EventBus,
) -> Result<(), InvariantViolation> {
    let unit = unit_mut(state, target)?;
    let was_fainted = unit.is_fainted;
    let did_faint = unit.take_damage(amount);

    bus.push(BattleEvent::DamageDealt {
        target,
        damage: amount,
        remaining_hp: unit.current_hp(),
    });

    if did_faint && !was_fainted {
        info!(unit = unit.display_name(), "unit fainted");
        bus.push(BattleEvent::UnitFainted {
            unit: target,
            team: unit.team,
        });
    }
    Ok(())
}

/// Experience for knocking out `defeated`, with leveling and the
/// notifications that go with it.
fn execute_award_experience(
    id: UnitId,
    amount: u32,
    defeated: &str,
    state: &mut GameState,
    bus: &mut EventBus,
    ctx: &CommandContext<'_>,
) -> Result<(), InvariantViolation> {
    let unit = unit_mut(state, id)?;
    let name = unit.display_name().to_string();
    let mut messages = vec![(
        "defeat",
        format!("{} defeated {} and gained {}xp!", name, defeated, amount),
    )];
    bus.push(BattleEvent::ExperienceGained { unit: id, amount });

    let Some(template) = ctx.templates.template(&unit.template_id) else {
        warn!(unit = %name, template = %unit.template_id, "no template cached, experience banked without leveling");
        unit.experience = unit.experience.saturating_add(amount);
        for (prefix, message) in messages {
            state.push_notification(prefix, message);
        }
        return Ok(());
    };

    let report = process_experience_gain(unit, amount, &template, ctx.config);

    for &level in &report.levels_reached {
        info!(unit = %name, level, "level up");
        bus.push(BattleEvent::LevelUp {
            unit: id,
            new_level: level,
        });
        messages.push((
            "levelup",
            format!("{} has leveled up to Level {}!", name, level),
        ));
    }

    for unlock in &report.unlocked_moves {
        bus.push(BattleEvent::MoveUnlocked {
            unit: id,
            move_name: unlock.move_.name.clone(),
            learned: unlock.learned,
        });
        let message = if unlock.learned {
            format!("{} learned {}!", name, unlock.move_.name)
        } else {
            format!(
                "{} can learn {} at level {}",
                name, unlock.move_.name, unlock.level
            )
        };
        messages.push(("move", message));
    }

    if let Some(evolution) = evolution_reached(&template, report.previous_level, unit.level) {
        messages.push((
            "evolution",
            format!("{} is ready to evolve into {}!", name, evolution.evolves_into),
        ));
    }

    for (prefix, message) in messages {
        state.push_notification(prefix, message);
    }
    Ok(())
}

/// Insert or overwrite units by id. The whole batch is checked against the
/// registry it would produce before anything is committed.
fn execute_place_units(
    units: Vec<Unit>,
    state: &mut GameState,
    bus: &mut EventBus,
) -> Result<(), InvariantViolation> {
    let replaced: BTreeSet<UnitId> = units.iter().map(|unit| unit.id).collect();
    let mut occupied: HashMap<Position, UnitId> = state
        .units
        .values()
        .filter(|unit| !replaced.contains(&unit.id))
        .map(|unit| (unit.position, unit.id))
        .collect();

    for unit in &units {
        ensure_in_bounds(state, unit.position)?;
        if let Some(&occupant) = occupied.get(&unit.position) {
            if occupant != unit.id {
                return Err(InvariantViolation::TileOccupied {
                    position: unit.position,
                    occupant,
                    incoming: unit.id,
                });
            }
        }
        occupied.insert(unit.position, unit.id);
    }

    for unit in units {
        bus.push(BattleEvent::UnitPlaced {
            unit: unit.id,
            position: unit.position,
        });
        state.units.insert(unit.id, unit);
    }
    Ok(())
}

/// Count down statuses on `team` and clear the ones that run out.
fn execute_tick_statuses(team: TeamId, state: &mut GameState, bus: &mut EventBus) {
    let mut recovered = Vec::new();
    for unit in state.units.values_mut() {
        if unit.team != Some(team) {
            continue;
        }
        let Some(status) = unit.status.as_mut() else {
            continue;
        };
        status.duration = status.duration.saturating_sub(1);
        if status.duration == 0 {
            let kind = status.kind;
            unit.status = None;
            bus.push(BattleEvent::StatusExpired {
                unit: unit.id,
                status: kind,
            });
            recovered.push(format!("{} recovered from {}", unit.display_name(), kind));
        }
    }
    for message in recovered {
        state.push_notification("status", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::BattleMap;
    use crate::species::{unit_from_template, TemplateCache, UnitOptions};
    use pretty_assertions::assert_eq;
    use schema::{BaseStats, BodySize, ElementalType, Evolution, SpeciesTemplate, StatusKind, Terrain};

    fn template() -> SpeciesTemplate {
        SpeciesTemplate {
            id: "charmander".to_string(),
            name: "charmander".to_string(),
            types: vec![ElementalType::Fire],
            base_stats: BaseStats {
                hp: 39,
                attack: 52,
                defense: 43,
                sp_attack: 60,
                sp_defense: 50,
                speed: 65,
            },
            natural_moves: Vec::new(),
            evolution: Some(Evolution {
                level: 16,
                evolves_into: "charmeleon".to_string(),
            }),
            size: BodySize { height: 0.6, weight: 8.5 },
            recruit_difficulty: 3.09,
        }
    }

    fn create_test_state() -> (GameState, UnitId, UnitId) {
        let template = template();
        let mut state = GameState::new(BattleMap::filled(4, 4, Terrain::Plain));
        let mut ally = unit_from_template(
            &template,
            15,
            Position::new(0, 0),
            UnitOptions {
                team: Some(TeamId::Team1),
                ..UnitOptions::default()
            },
            4,
        );
        ally.id = UnitId::from_u128(1);
        let mut enemy = unit_from_template(
            &template,
            5,
            Position::new(1, 0),
            UnitOptions {
                team: Some(TeamId::Team2),
                nickname: Some("Blaze".to_string()),
                ..UnitOptions::default()
            },
            4,
        );
        enemy.id = UnitId::from_u128(2);
        state.units.insert(ally.id, ally);
        state.units.insert(enemy.id, enemy);
        (state, UnitId::from_u128(1), UnitId::from_u128(2))
    }

    fn run(
        commands: Vec<BattleCommand>,
        state: &mut GameState,
        templates: &TemplateCache,
    ) -> (Result<(), InvariantViolation>, EventBus) {
        let config = BattleConfig::default();
        let ctx = CommandContext {
            templates,
            config: &config,
        };
        let mut bus = EventBus::new();
        let result = execute_command_batch(commands, state, &mut bus, &ctx);
        (result, bus)
    }

    #[test]
    fn test_deal_damage_clamps_and_faints_once() {
        let (mut state, _, enemy) = create_test_state();
        let (result, bus) = run(
            vec![
                BattleCommand::DealDamage {
                    target: enemy,
                    amount: 500,
                },
                BattleCommand::DealDamage {
                    target: enemy,
                    amount: 5,
                },
            ],
            &mut state,
            &TemplateCache::new(),
        );

        assert!(result.is_ok());
        let unit = state.unit(enemy).unwrap();
        assert_eq!(unit.current_hp(), 0);
        assert!(unit.is_fainted);
        let faints = bus
            .events()
            .iter()
            .filter(|event| matches!(event, BattleEvent::UnitFainted { .. }))
            .count();
        assert_eq!(faints, 1);
    }

    #[test]
    fn test_move_unit_rejects_occupied_and_off_map_tiles() {
        let (mut state, ally, enemy) = create_test_state();
        let cache = TemplateCache::new();

        let (result, _) = run(
            vec![BattleCommand::MoveUnit {
                unit: ally,
                to: Position::new(1, 0),
            }],
            &mut state,
            &cache,
        );
        assert_eq!(
            result,
            Err(InvariantViolation::TileOccupied {
                position: Position::new(1, 0),
                occupant: enemy,
                incoming: ally,
            })
        );

        let (result, _) = run(
            vec![BattleCommand::MoveUnit {
                unit: ally,
                to: Position::new(4, 0),
            }],
            &mut state,
            &cache,
        );
        assert!(matches!(result, Err(InvariantViolation::OutOfBounds { .. })));
    }

    #[test]
    fn test_move_unit_updates_position_and_facing() {
        let (mut state, ally, _) = create_test_state();
        let (result, bus) = run(
            vec![BattleCommand::MoveUnit {
                unit: ally,
                to: Position::new(0, 2),
            }],
            &mut state,
            &TemplateCache::new(),
        );

        assert!(result.is_ok());
        let unit = state.unit(ally).unwrap();
        assert_eq!(unit.position, Position::new(0, 2));
        assert_eq!(unit.facing, Direction::South);
        assert!(unit.has_moved);
        assert_eq!(
            bus.events(),
            &[BattleEvent::UnitMoved {
                unit: ally,
                from: Position::new(0, 0),
                to: Position::new(0, 2),
            }]
        );
    }

    #[test]
    fn test_award_experience_levels_and_announces_evolution() {
        let (mut state, ally, _) = create_test_state();
        let cache = TemplateCache::new();
        cache.insert(template());

        let (result, bus) = run(
            vec![BattleCommand::AwardExperience {
                unit: ally,
                amount: 15,
                defeated: "Blaze".to_string(),
            }],
            &mut state,
            &cache,
        );

        assert!(result.is_ok());
        assert_eq!(state.unit(ally).unwrap().level, 16);
        assert_eq!(
            state.notification_messages(),
            vec![
                "charmander defeated Blaze and gained 15xp!",
                "charmander has leveled up to Level 16!",
                "charmander is ready to evolve into charmeleon!",
            ]
        );
        assert!(state.notifications[0].id.starts_with("defeat-"));
        assert!(bus
            .events()
            .contains(&BattleEvent::LevelUp { unit: ally, new_level: 16 }));
    }

    #[test]
    fn test_award_experience_without_template_banks_it() {
        let (mut state, ally, _) = create_test_state();
        let (result, _) = run(
            vec![BattleCommand::AwardExperience {
                unit: ally,
                amount: 40,
                defeated: "Blaze".to_string(),
            }],
            &mut state,
            &TemplateCache::new(),
        );

        assert!(result.is_ok());
        let unit = state.unit(ally).unwrap();
        assert_eq!(unit.level, 15);
        assert_eq!(unit.experience, 40);
        assert_eq!(state.notifications.len(), 1);
    }

    #[test]
    fn test_place_units_checks_the_resulting_registry() {
        let (mut state, ally, enemy) = create_test_state();
        let cache = TemplateCache::new();

        // The enemy leaves (1, 0) in the same batch that the ally enters it
        let mut moved_ally = state.unit(ally).unwrap().clone();
        moved_ally.position = Position::new(1, 0);
        let mut moved_enemy = state.unit(enemy).unwrap().clone();
        moved_enemy.position = Position::new(3, 3);
        let (result, _) = run(
            vec![BattleCommand::PlaceUnits(vec![moved_ally, moved_enemy])],
            &mut state,
            &cache,
        );
        assert!(result.is_ok());
        assert_eq!(state.unit(ally).unwrap().position, Position::new(1, 0));
        assert!(state.check_invariants().is_ok());

        let mut intruder = state.unit(enemy).unwrap().clone();
        intruder.id = UnitId::from_u128(3);
        let (result, _) = run(
            vec![BattleCommand::PlaceUnits(vec![intruder])],
            &mut state,
            &cache,
        );
        assert!(matches!(result, Err(InvariantViolation::TileOccupied { .. })));
        assert_eq!(state.units.len(), 2);
    }

    #[test]
    fn test_tick_statuses_only_touches_the_given_team() {
        let (mut state, ally, enemy) = create_test_state();
        state.units.get_mut(&ally).unwrap().status = Some(StatusEffect::new(StatusKind::Burn, 1));
        state.units.get_mut(&enemy).unwrap().status = Some(StatusEffect::new(StatusKind::Sleep, 1));

        let (result, bus) = run(
            vec![BattleCommand::TickStatuses { team: TeamId::Team2 }],
            &mut state,
            &TemplateCache::new(),
        );

        assert!(result.is_ok());
        assert!(state.unit(ally).unwrap().status.is_some());
        assert!(state.unit(enemy).unwrap().status.is_none());
        assert_eq!(state.notification_messages(), vec!["Blaze recovered from sleep"]);
        assert_eq!(
            bus.events(),
            &[BattleEvent::StatusExpired {
                unit: enemy,
                status: StatusKind::Sleep,
            }]
        );
    }

    #[test]
    fn test_dismiss_notification_removes_only_that_entry() {
        let (mut state, _, _) = create_test_state();
        let (result, _) = run(
            vec![
                BattleCommand::AddNotification {
                    prefix: "notification",
                    message: "first".to_string(),
                },
                BattleCommand::AddNotification {
                    prefix: "notification",
                    message: "second".to_string(),
                },
                BattleCommand::DismissNotification("notification-0".to_string()),
                BattleCommand::DismissNotification("missing".to_string()),
            ],
            &mut state,
            &TemplateCache::new(),
        );

        assert!(result.is_ok());
        assert_eq!(state.notification_messages(), vec!["second"]);
    }

    #[test]
    fn test_spend_attack_rejects_unknown_slot() {
        let (mut state, ally, _) = create_test_state();
        let (result, _) = run(
            vec![BattleCommand::SpendAttack {
                unit: ally,
                slot: 9,
                facing: None,
            }],
            &mut state,
            &TemplateCache::new(),
        );
        assert_eq!(
            result,
            Err(InvariantViolation::InvalidMoveSlot { unit: ally, slot: 9 })
        );
    }
}
