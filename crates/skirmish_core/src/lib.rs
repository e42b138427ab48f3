//! # Skirmish Core
//!
//! Deterministic world model consumed by the skirmish decision engine.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond parsing caller-supplied strings
//! - No system randomness
//! - No floating-point math in decisions (uses fixed-point)
//!
//! The engine in `skirmish_ai` never reaches into a concrete host. It talks
//! to the [`rules::ActionRules`] and [`pathfinding::StepFinder`] traits; the
//! implementations shipped here ([`rules::StandardRules`],
//! [`pathfinding::AStarStepFinder`]) mirror the usual grid-RTS rules so the
//! engine can be exercised headless.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Positions, directions, terrain
//! - [`unit`] - Units, owners, in-progress actions
//! - [`stats`] - Per-type unit statistics table
//! - [`action`] - Primitive unit actions and the joint action
//! - [`snapshot`] - Immutable per-tick world snapshot
//! - [`rules`] - Action legality
//! - [`pathfinding`] - Single-step A* fallback
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod error;
pub mod grid;
pub mod math;
pub mod pathfinding;
pub mod rules;
pub mod snapshot;
pub mod stats;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{JointAction, UnitAction};
    pub use crate::error::{CoreError, Result};
    pub use crate::grid::{Cell, Direction, Position, Terrain};
    pub use crate::math::Fixed;
    pub use crate::pathfinding::{AStarStepFinder, Occupancy, PathGoal, StepFinder};
    pub use crate::rules::{ActionRules, StandardRules};
    pub use crate::snapshot::Snapshot;
    pub use crate::stats::{UnitStats, UnitTypeTable};
    pub use crate::unit::{PendingAction, PlayerId, Unit, UnitId, UnitKind};
}
