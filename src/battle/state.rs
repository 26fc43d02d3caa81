use crate::errors::InvariantViolation;
use crate::map::{BattleMap, MapAccessor, Tile};
use crate::unit::{Unit, UnitId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{Position, StatusKind, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Movement,
    /// A move is chosen and its targets are highlighted.
    Combat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub dismissed: bool,
}

/// The whole battle at one point in time. Every intent produces a new value.
///
/// Units live only in `units`; tiles are derived from the map and the
/// registry, so a unit's position is the single record of where it stands.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub map: BattleMap,
    pub current_turn: TeamId,
    pub phase: Phase,
    pub selected_unit: Option<UnitId>,
    /// Slot in the selected unit's move list.
    pub selected_move: Option<usize>,
    pub valid_moves: BTreeSet<Position>,
    pub valid_targets: BTreeSet<Position>,
    pub units: BTreeMap<UnitId, Unit>,
    pub notifications: Vec<Notification>,
    pub next_notification_id: u64,
}

impl GameState {
    pub fn new(map: BattleMap) -> Self {
        Self {
            map,
            current_turn: TeamId::Team1,
            phase: Phase::Movement,
            selected_unit: None,
            selected_move: None,
            valid_moves: BTreeSet::new(),
            valid_targets: BTreeSet::new(),
            units: BTreeMap::new(),
            notifications: Vec::new(),
            next_notification_id: 0,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn selected(&self) -> Option<&Unit> {
        self.selected_unit.and_then(|id| self.units.get(&id))
    }

    pub fn team_units(&self, team: TeamId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |unit| unit.team == Some(team))
    }

    /// All tiles, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.map
            .positions()
            .filter_map(move |position| self.tile(position))
    }

    /// Every unit on the map and no two sharing a tile.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut occupied: HashMap<Position, UnitId> = HashMap::new();
        for unit in self.units.values() {
            if !self.map.contains(unit.position) {
                return Err(InvariantViolation::OutOfBounds {
                    position: unit.position,
                    width: self.map.width(),
                    height: self.map.height(),
                });
            }
            if let Some(occupant) = occupied.insert(unit.position, unit.id) {
                return Err(InvariantViolation::TileOccupied {
                    position: unit.position,
                    occupant,
                    incoming: unit.id,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn push_notification(&mut self, prefix: &str, message: String) -> String {
        let id = format!("{}-{}", prefix, self.next_notification_id);
        self.next_notification_id += 1;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.notifications.push(Notification {
            id: id.clone(),
            message,
            timestamp,
            dismissed: false,
        });
        id
    }

    pub fn notification_messages(&self) -> Vec<&str> {
        self.notifications
            .iter()
            .map(|notification| notification.message.as_str())
            .collect()
    }
}

impl MapAccessor for GameState {
    fn tile(&self, position: Position) -> Option<Tile> {
        let terrain = self.map.terrain(position)?;
        let highlighted = match self.phase {
            Phase::Movement => self.valid_moves.contains(&position),
            Phase::Combat => self.valid_targets.contains(&position),
        };
        let selectable = match self.phase {
            Phase::Movement => true,
            Phase::Combat => self.valid_targets.contains(&position),
        };
        Some(Tile {
            position,
            terrain,
            occupant: self.unit_at(position).map(|unit| unit.id),
            highlighted,
            selectable,
        })
    }

    fn is_valid_position(&self, position: Position) -> bool {
        self.map.contains(position)
    }

    fn unit_at(&self, position: Position) -> Option<&Unit> {
        self.units.values().find(|unit| unit.position == position)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    UnitSelected {
        unit: UnitId,
        reachable: usize,
    },
    SelectionCleared,
    UnitMoved {
        unit: UnitId,
        from: Position,
        to: Position,
    },
    MoveSelected {
        unit: UnitId,
        slot: usize,
        targets: usize,
    },
    MoveUsed {
        attacker: UnitId,
        move_name: String,
        target: Position,
    },
    DamageDealt {
        target: UnitId,
        damage: u32,
        remaining_hp: u16,
    },
    UnitFainted {
        unit: UnitId,
        team: Option<TeamId>,
    },
    UnitRemoved {
        unit: UnitId,
    },
    ExperienceGained {
        unit: UnitId,
        amount: u32,
    },
    LevelUp {
        unit: UnitId,
        new_level: u8,
    },
    MoveUnlocked {
        unit: UnitId,
        move_name: String,
        learned: bool,
    },
    StatusApplied {
        unit: UnitId,
        status: StatusKind,
    },
    StatusExpired {
        unit: UnitId,
        status: StatusKind,
    },
    UnitPlaced {
        unit: UnitId,
        position: Position,
    },
    TurnEnded {
        next_turn: TeamId,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl std::fmt::Display for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum RollSource {
    Scripted { outcomes: Vec<u8>, index: usize },
    Live(StdRng),
}

/// Percentile rolls (1..=100) for one transition.
///
/// Tests script the exact outcomes; live battles draw from a seeded or
/// entropy-backed generator.
#[derive(Debug)]
pub struct TurnRng {
    source: RollSource,
}

impl TurnRng {
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            source: RollSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn new_random() -> Self {
        Self {
            source: RollSource::Live(StdRng::from_os_rng()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: RollSource::Live(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = match &mut self.source {
            RollSource::Scripted { outcomes, index } => {
                if *index >= outcomes.len() {
                    panic!(
                        "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                        reason
                    );
                }
                let outcome = outcomes[*index];
                *index += 1;
                outcome
            }
            RollSource::Live(rng) => rng.random_range(1..=100),
        };
        tracing::trace!(outcome, reason, "rng consumed");
        outcome
    }
}
