use crate::battle::calculators::MoveResolver;
use crate::battle::commands::{execute_command_batch, BattleCommand, CommandContext};
use crate::battle::movement::MovementPlanner;
use crate::battle::state::{BattleEvent, EventBus, GameState, TurnRng};
use crate::battle::targeting::{
    affected_tiles_from, valid_targets, validate_move, LineOfSight, OpenField,
};
use crate::config::BattleConfig;
use crate::errors::BattleResult;
use crate::map::MapAccessor;
use crate::progression::experience_for_defeat;
use crate::species::TemplateLookup;
use crate::unit::{Unit, UnitId};
use schema::{Direction, Position};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Everything the surrounding application can ask the battle to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// A click on the grid: select a unit or move the selected one there.
    SelectTile(Position),
    SelectUnit(UnitId),
    DeselectUnit,
    /// Choose a move slot of the selected unit and highlight its targets.
    SelectMove(usize),
    CancelAttack,
    ExecuteAttack {
        attacker: UnitId,
        target: UnitId,
        move_slot: usize,
    },
    AddUnits(Vec<Unit>),
    EndTurn,
    AddNotification(String),
    DismissNotification(String),
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SelectTile(_) => "select_tile",
            Intent::SelectUnit(_) => "select_unit",
            Intent::DeselectUnit => "deselect_unit",
            Intent::SelectMove(_) => "select_move",
            Intent::CancelAttack => "cancel_attack",
            Intent::ExecuteAttack { .. } => "execute_attack",
            Intent::AddUnits(_) => "add_units",
            Intent::EndTurn => "end_turn",
            Intent::AddNotification(_) => "add_notification",
            Intent::DismissNotification(_) => "dismiss_notification",
        }
    }
}

/// The state an intent produced and what happened on the way.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub events: EventBus,
}

/// Turn and battle state machine.
///
/// Intents that make no sense for the current state are ignored and the state
/// comes back unchanged. Anything that would leave the grid inconsistent is an
/// error instead.
pub struct BattleEngine {
    templates: Arc<dyn TemplateLookup>,
    planner: MovementPlanner,
    resolver: MoveResolver,
    sight: Box<dyn LineOfSight>,
    config: BattleConfig,
}

impl BattleEngine {
    pub fn new(templates: Arc<dyn TemplateLookup>, config: BattleConfig) -> Self {
        Self {
            planner: MovementPlanner::new(Arc::clone(&templates), &config),
            resolver: MoveResolver::new(Arc::clone(&templates), &config),
            templates,
            sight: Box::new(OpenField),
            config,
        }
    }

    pub fn with_line_of_sight(mut self, sight: impl LineOfSight + 'static) -> Self {
        self.sight = Box::new(sight);
        self
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn planner(&self) -> &MovementPlanner {
        &self.planner
    }

    pub fn resolver(&self) -> &MoveResolver {
        &self.resolver
    }

    pub fn line_of_sight(&self) -> &dyn LineOfSight {
        self.sight.as_ref()
    }

    pub fn apply(
        &self,
        state: &GameState,
        intent: Intent,
        rng: &mut TurnRng,
    ) -> BattleResult<GameState> {
        self.step(state, intent, rng).map(|transition| transition.state)
    }

    /// Apply one intent to a copy of `state`.
    pub fn step(
        &self,
        state: &GameState,
        intent: Intent,
        rng: &mut TurnRng,
    ) -> BattleResult<Transition> {
        let name = intent.name();
        let mut bus = EventBus::new();

        let Some(commands) = self.plan(state, intent, rng) else {
            debug!(intent = name, "intent ignored");
            return Ok(Transition {
                state: state.clone(),
                events: bus,
            });
        };

        let mut next = state.clone();
        let ctx = CommandContext {
            templates: self.templates.as_ref(),
            config: &self.config,
        };
        execute_command_batch(commands, &mut next, &mut bus, &ctx)?;
        next.check_invariants()?;

        debug!(intent = name, events = bus.len(), "intent applied");
        Ok(Transition {
            state: next,
            events: bus,
        })
    }

    /// Commands for an intent, or `None` when it does not apply.
    fn plan(
        &self,
        state: &GameState,
        intent: Intent,
        rng: &mut TurnRng,
    ) -> Option<Vec<BattleCommand>> {
        match intent {
            Intent::SelectTile(position) => Some(self.plan_select_tile(state, position)),
            Intent::SelectUnit(id) => {
                let unit = state.unit(id).filter(|unit| !unit.is_fainted)?;
                Some(vec![BattleCommand::SelectUnit {
                    unit: id,
                    reachable: self.reachable_for(unit, state),
                }])
            }
            Intent::DeselectUnit => Some(vec![BattleCommand::ClearSelection]),
            Intent::SelectMove(slot) => self.plan_select_move(state, slot),
            Intent::CancelAttack => {
                if state.selected_move.is_none() && state.valid_targets.is_empty() {
                    return None;
                }
                Some(vec![BattleCommand::ClearMoveSelection])
            }
            Intent::ExecuteAttack {
                attacker,
                target,
                move_slot,
            } => self.plan_attack(state, attacker, target, move_slot, rng),
            Intent::AddUnits(units) => Some(vec![BattleCommand::PlaceUnits(units)]),
            Intent::EndTurn => {
                let next_turn = state.current_turn.opponent();
                Some(vec![
                    BattleCommand::TickStatuses {
                        team: state.current_turn,
                    },
                    BattleCommand::ClearSelection,
                    BattleCommand::ResetActions,
                    BattleCommand::SetTurn(next_turn),
                    BattleCommand::EmitEvent(BattleEvent::TurnEnded { next_turn }),
                ])
            }
            Intent::AddNotification(message) => Some(vec![BattleCommand::AddNotification {
                prefix: "notification",
                message,
            }]),
            Intent::DismissNotification(id) => {
                if !state.notifications.iter().any(|n| n.id == id) {
                    return None;
                }
                Some(vec![BattleCommand::DismissNotification(id)])
            }
        }
    }

    /// A unit that already moved this turn gets no tiles.
    fn reachable_for(&self, unit: &Unit, state: &GameState) -> BTreeSet<Position> {
        if unit.has_moved {
            BTreeSet::new()
        } else {
            self.planner.reachable_tiles(unit, state)
        }
    }

    fn plan_select_tile(&self, state: &GameState, position: Position) -> Vec<BattleCommand> {
        if let Some(unit) = state.unit_at(position) {
            if unit.team == Some(state.current_turn) && unit.can_act() {
                return vec![BattleCommand::SelectUnit {
                    unit: unit.id,
                    reachable: self.reachable_for(unit, state),
                }];
            }
            return vec![BattleCommand::ClearSelection];
        }

        match state.selected() {
            Some(selected)
                if selected.team == Some(state.current_turn)
                    && !selected.is_fainted
                    && !selected.has_moved
                    && state.valid_moves.contains(&position) =>
            {
                vec![
                    BattleCommand::MoveUnit {
                        unit: selected.id,
                        to: position,
                    },
                    BattleCommand::ClearSelection,
                ]
            }
            _ => vec![BattleCommand::ClearSelection],
        }
    }

    fn plan_select_move(&self, state: &GameState, slot: usize) -> Option<Vec<BattleCommand>> {
        let unit = state
            .selected()
            .filter(|unit| !unit.is_fainted && !unit.has_attacked)?;
        let move_instance = unit
            .move_slot(slot)
            .filter(|instance| !instance.disabled && instance.current_pp > 0)?;

        let targets = valid_targets(move_instance, unit, state, self.sight.as_ref());
        Some(vec![BattleCommand::SelectMove { slot, targets }])
    }

    fn plan_attack(
        &self,
        state: &GameState,
        attacker_id: UnitId,
        target_id: UnitId,
        slot: usize,
        rng: &mut TurnRng,
    ) -> Option<Vec<BattleCommand>> {
        let attacker = state
            .unit(attacker_id)
            .filter(|unit| !unit.is_fainted && !unit.has_attacked)?;
        if attacker.team != Some(state.current_turn) {
            return None;
        }
        let move_instance = attacker
            .move_slot(slot)
            .filter(|instance| !instance.disabled && instance.current_pp > 0)?;
        let target = state.unit(target_id).filter(|unit| !unit.is_fainted)?;

        let validation = validate_move(
            move_instance,
            attacker,
            target.position,
            state,
            self.sight.as_ref(),
        );
        if !validation.is_valid {
            debug!(errors = ?validation.errors, "attack rejected");
            return None;
        }

        let template = &move_instance.template;
        let rules = template.tactical.targeting;
        let mut area = affected_tiles_from(
            template.tactical.area_of_effect,
            attacker.position,
            target.position,
            state,
        );
        area.insert(target.position);

        let victims: Vec<&Unit> = area
            .iter()
            .filter_map(|position| state.unit_at(*position))
            .filter(|unit| !unit.is_fainted)
            .filter(|unit| {
                if unit.id == attacker.id {
                    rules.affects_self
                } else {
                    !unit.is_ally_of(attacker) || rules.affects_allies
                }
            })
            .collect();

        let mut commands = vec![
            BattleCommand::EmitEvent(BattleEvent::MoveUsed {
                attacker: attacker.id,
                move_name: template.name.clone(),
                target: target.position,
            }),
            BattleCommand::SpendAttack {
                unit: attacker.id,
                slot,
                facing: Direction::toward(attacker.position, target.position),
            },
        ];
        let mut removals = Vec::new();

        let outcomes = self
            .resolver
            .resolve_move_effects(template, attacker, &victims, rng);
        for (victim, outcome) in victims.iter().zip(outcomes) {
            if !template.is_status() {
                commands.push(BattleCommand::DealDamage {
                    target: victim.id,
                    amount: outcome.damage,
                });
                if outcome.damage >= victim.current_hp() as u32 {
                    if victim.id != attacker.id {
                        commands.push(BattleCommand::AwardExperience {
                            unit: attacker.id,
                            amount: experience_for_defeat(victim),
                            defeated: victim.display_name().to_string(),
                        });
                    }
                    if victim.team == Some(self.config.player_team.opponent()) {
                        removals.push(BattleCommand::RemoveUnit { unit: victim.id });
                    }
                    continue;
                }
            }

            if let Some(status) = outcome.applied_statuses.first() {
                if victim.status.is_none() || rules.can_overwrite_status {
                    commands.push(BattleCommand::ApplyStatus {
                        target: victim.id,
                        status: *status,
                    });
                }
            }
        }

        commands.extend(removals);
        commands.push(BattleCommand::ClearMoveSelection);
        Some(commands)
    }
}
