use crate::unit::UnitId;
use schema::Position;
use thiserror::Error;

/// Main error type for the Grid Tactics battle engine
#[derive(Debug, Error)]
pub enum BattleError {
    /// Error related to template lookup or fetching
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    /// A transition would break the grid/registry consistency
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    /// Error related to loading configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while resolving species and move templates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The identifier does not resolve to any species or move
    #[error("Template not found: {0}")]
    NotFound(String),
    /// The template source could not be reached or returned an unreadable document
    #[error("Upstream fetch failed for '{identifier}': {reason}")]
    UpstreamFetch { identifier: String, reason: String },
    /// The document was readable but is missing data the engine needs
    #[error("Malformed template '{identifier}': {details}")]
    Malformed { identifier: String, details: String },
}

/// Programming faults: state that must never be committed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Position {position} is outside the {width}x{height} map")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
    #[error("Tile {position} is already held by unit {occupant}, cannot place {incoming}")]
    TileOccupied {
        position: Position,
        occupant: UnitId,
        incoming: UnitId,
    },
    #[error("Unit {0} is not registered")]
    UnknownUnit(UnitId),
    #[error("Unit {unit} has no move in slot {slot}")]
    InvalidMoveSlot { unit: UnitId, slot: usize },
}

/// Errors related to loading battle configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Type alias for Results using BattleError
pub type BattleResult<T> = Result<T, BattleError>;

/// Type alias for Results using TemplateError
pub type TemplateResult<T> = Result<T, TemplateError>;
