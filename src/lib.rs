// In: src/lib.rs

//! Grid Tactics Battle Engine
//!
//! A turn-based tactical battle engine: units stand on a terrain grid, walk a
//! terrain-costed range, and trade moves with areas of effect, type-chart
//! damage, status effects and experience. Every intent yields a new
//! `GameState`; the engine itself holds no battle state.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod config;
pub mod errors;
pub mod map;
pub mod progression;
pub mod species;
pub mod unit;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{
    AreaOfEffect, BaseStats, Direction, ElementalType, MoveCategory, MoveTemplate, Position,
    SpeciesTemplate, StatusKind, TeamId, Terrain,
};

// --- From this crate's modules (`src/`) ---

// The state machine and the state it produces.
pub use battle::engine::{BattleEngine, Intent, Transition};
pub use battle::state::{BattleEvent, EventBus, GameState, Notification, Phase, TurnRng};
pub use battle::targeting::{LineOfSight, OpenField, TerrainSightline};

// Grid and units.
pub use map::{BattleMap, MapAccessor, MapConfig, Tile, PREDEFINED_MAPS};
pub use unit::{MoveInstance, Stats, StatusEffect, Unit, UnitId};

// Template resolution.
pub use species::{
    DirectorySource, StaticSource, TemplateCache, TemplateLookup, TemplateProvider,
    TemplateSource, UnitOptions,
};

pub use config::BattleConfig;

// Crate-specific error and result types.
pub use errors::{
    BattleError, BattleResult, ConfigError, InvariantViolation, TemplateError, TemplateResult,
};
