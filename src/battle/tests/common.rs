use crate::battle::engine::{BattleEngine, Intent};
use crate::battle::state::{GameState, TurnRng};
use crate::config::BattleConfig;
use crate::errors::BattleResult;
use crate::map::BattleMap;
use crate::species::{unit_from_template, TemplateCache, UnitOptions};
use crate::unit::{StatusEffect, Unit, UnitId};
use schema::{
    AreaOfEffect, BaseStats, BodySize, ElementalType, Evolution, LearnMethod, LearnableMove,
    MoveCategory, MoveEffects, MoveTemplate, Position, RangeBounds, SpeciesTemplate,
    StatusInfliction, StatusKind, TacticalProfile, TeamId, Terrain,
};
use std::sync::Arc;

fn move_template(
    id: &str,
    elemental_type: ElementalType,
    category: MoveCategory,
    base_power: u16,
    pp: u8,
) -> MoveTemplate {
    MoveTemplate {
        id: id.to_string(),
        name: id.to_string(),
        elemental_type,
        category,
        base_power,
        accuracy: 100,
        pp,
        priority: 0,
        tactical: TacticalProfile::default(),
        effects: MoveEffects::default(),
        description: String::new(),
    }
}

pub fn tackle() -> MoveTemplate {
    move_template("tackle", ElementalType::Normal, MoveCategory::Physical, 40, 35)
}

pub fn bite() -> MoveTemplate {
    move_template("bite", ElementalType::Dark, MoveCategory::Physical, 60, 25)
}

/// Reaches two tiles and may burn.
pub fn ember() -> MoveTemplate {
    let mut ember = move_template("ember", ElementalType::Fire, MoveCategory::Special, 40, 25);
    ember.tactical.range = RangeBounds { min: 1, max: 2 };
    ember.effects.status = Some(StatusInfliction {
        kind: StatusKind::Burn,
        chance: 10,
        duration: 3,
    });
    ember
}

/// Always paralyzes, never damages.
pub fn thunder_wave() -> MoveTemplate {
    let mut wave = move_template("thunder-wave", ElementalType::Electric, MoveCategory::Status, 0, 20);
    wave.tactical.range = RangeBounds { min: 1, max: 2 };
    wave.effects.status = Some(StatusInfliction {
        kind: StatusKind::Paralysis,
        chance: 100,
        duration: 2,
    });
    wave
}

/// Hits a diamond around the aimed tile.
pub fn earthquake() -> MoveTemplate {
    let mut quake = move_template("earthquake", ElementalType::Ground, MoveCategory::Physical, 100, 10);
    quake.tactical.range = RangeBounds { min: 1, max: 2 };
    quake.tactical.area_of_effect = AreaOfEffect::Diamond { size: 1 };
    quake
}

fn learnable(move_: MoveTemplate, level: u8) -> LearnableMove {
    LearnableMove {
        move_,
        level_learned: level,
        method: LearnMethod::LevelUp,
    }
}

fn species(
    id: &str,
    types: Vec<ElementalType>,
    [hp, attack, defense, sp_attack, sp_defense, speed]: [u8; 6],
    natural_moves: Vec<LearnableMove>,
    evolution: Option<Evolution>,
) -> SpeciesTemplate {
    SpeciesTemplate {
        id: id.to_string(),
        name: id.to_string(),
        types,
        base_stats: BaseStats {
            hp,
            attack,
            defense,
            sp_attack,
            sp_defense,
            speed,
        },
        natural_moves,
        evolution,
        size: BodySize { height: 0.5, weight: 8.0 },
        recruit_difficulty: 3.0,
    }
}

pub fn charmander() -> SpeciesTemplate {
    species(
        "charmander",
        vec![ElementalType::Fire],
        [39, 52, 43, 60, 50, 65],
        vec![learnable(tackle(), 1), learnable(ember(), 1), learnable(bite(), 11)],
        Some(Evolution {
            level: 16,
            evolves_into: "charmeleon".to_string(),
        }),
    )
}

pub fn rattata() -> SpeciesTemplate {
    species(
        "rattata",
        vec![ElementalType::Normal],
        [30, 56, 35, 25, 35, 72],
        vec![learnable(tackle(), 1), learnable(bite(), 6)],
        None,
    )
}

pub fn pikachu() -> SpeciesTemplate {
    species(
        "pikachu",
        vec![ElementalType::Electric],
        [35, 55, 40, 50, 50, 90],
        vec![learnable(tackle(), 1), learnable(thunder_wave(), 1)],
        None,
    )
}

pub fn geodude() -> SpeciesTemplate {
    species(
        "geodude",
        vec![ElementalType::Rock, ElementalType::Ground],
        [40, 80, 100, 30, 30, 20],
        vec![learnable(tackle(), 1), learnable(earthquake(), 1)],
        None,
    )
}

/// A cache holding every test species.
pub fn test_templates() -> TemplateCache {
    let cache = TemplateCache::new();
    for template in [charmander(), rattata(), pikachu(), geodude()] {
        cache.insert(template);
    }
    cache
}

pub fn create_test_engine() -> BattleEngine {
    create_test_engine_with(BattleConfig::default())
}

pub fn create_test_engine_with(config: BattleConfig) -> BattleEngine {
    BattleEngine::new(Arc::new(test_templates()), config)
}

/// A builder for creating test units with common defaults.
///
/// # Example
/// ```ignore
/// let unit = TestUnitBuilder::new(charmander(), 10)
///     .with_id(1)
///     .at(2, 3)
///     .on_team(TeamId::Team1)
///     .build();
/// ```
pub struct TestUnitBuilder {
    template: SpeciesTemplate,
    level: u8,
    id: Option<u128>,
    position: Position,
    team: Option<TeamId>,
    nickname: Option<String>,
    moves: Option<Vec<MoveTemplate>>,
    status: Option<StatusEffect>,
    current_hp: Option<u16>,
    has_moved: bool,
    has_attacked: bool,
}

impl TestUnitBuilder {
    pub fn new(template: SpeciesTemplate, level: u8) -> Self {
        Self {
            template,
            level,
            id: None,
            position: Position::new(0, 0),
            team: Some(TeamId::Team1),
            nickname: None,
            moves: None,
            status: None,
            current_hp: None,
            has_moved: false,
            has_attacked: false,
        }
    }

    pub fn with_id(mut self, id: u128) -> Self {
        self.id = Some(id);
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn on_team(mut self, team: TeamId) -> Self {
        self.team = Some(team);
        self
    }

    /// A unit fighting for neither side.
    pub fn without_team(mut self) -> Self {
        self.team = None;
        self
    }

    pub fn nicknamed(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    /// Replace the natural move list.
    pub fn with_moves(mut self, moves: Vec<MoveTemplate>) -> Self {
        self.moves = Some(moves);
        self
    }

    pub fn with_status(mut self, kind: StatusKind, duration: u8) -> Self {
        self.status = Some(StatusEffect::new(kind, duration));
        self
    }

    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn moved(mut self) -> Self {
        self.has_moved = true;
        self
    }

    pub fn attacked(mut self) -> Self {
        self.has_attacked = true;
        self
    }

    pub fn build(self) -> Unit {
        let mut unit = unit_from_template(
            &self.template,
            self.level,
            self.position,
            UnitOptions {
                nickname: self.nickname,
                is_leader: false,
                team: self.team,
            },
            4,
        );
        if let Some(id) = self.id {
            unit.id = UnitId::from_u128(id);
        }
        if let Some(moves) = self.moves {
            unit.moves = moves.into_iter().map(crate::unit::MoveInstance::new).collect();
        }
        if let Some(hp) = self.current_hp {
            unit.current_stats.hp = hp;
        }
        unit.status = self.status;
        unit.has_moved = self.has_moved;
        unit.has_attacked = self.has_attacked;
        unit
    }
}

/// An open plain of the given size holding `units`.
pub fn create_test_battle(width: usize, height: usize, units: Vec<Unit>) -> GameState {
    let mut state = GameState::new(BattleMap::filled(width, height, Terrain::Plain));
    for unit in units {
        state.units.insert(unit.id, unit);
    }
    state
}

/// Creates a `TurnRng` with a long list of max rolls.
/// Damage comes out at its top value and only sure-hit statuses land.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![100; 100])
}

pub fn id(value: u128) -> UnitId {
    UnitId::from_u128(value)
}

/// Apply a chain of intents, failing the test on any error.
pub fn apply_all(engine: &BattleEngine, state: &GameState, intents: Vec<Intent>) -> GameState {
    let mut rng = predictable_rng();
    intents.into_iter().fold(state.clone(), |current, intent| {
        assert_ok(engine.apply(&current, intent, &mut rng))
    })
}

/// Route engine logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Helper function to assert that a Result is Ok and return the value.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}
