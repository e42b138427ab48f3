//! Error types for the skirmish world model.

use thiserror::Error;

use crate::grid::Position;
use crate::unit::UnitId;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for world-model errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Two units in a snapshot share an id.
    #[error("Duplicate unit ID in snapshot: {0}")]
    DuplicateUnitId(UnitId),

    /// A unit sits outside the terrain bounds.
    #[error("Unit {unit} at {position} is outside the {width}x{height} map")]
    UnitOutOfBounds {
        /// Offending unit.
        unit: UnitId,
        /// Its position.
        position: Position,
        /// Map width.
        width: u32,
        /// Map height.
        height: u32,
    },

    /// Two units occupy the same cell.
    #[error("Units {first} and {second} both occupy {position}")]
    CellConflict {
        /// First occupant.
        first: UnitId,
        /// Second occupant.
        second: UnitId,
        /// Shared cell.
        position: Position,
    },

    /// Terrain cell data does not match the declared dimensions.
    #[error("Terrain has {actual} cells, expected {expected}")]
    TerrainSizeMismatch {
        /// Cells required by width x height.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
