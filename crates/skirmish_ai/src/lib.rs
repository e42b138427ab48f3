//! # Skirmish AI
//!
//! Per-tick decision engine for a grid RTS bot.
//!
//! Each tick the engine reads one [`skirmish_core::snapshot::Snapshot`] and
//! returns exactly one legal action for every unit it owns, with no two
//! units claiming the same cell. Decisions are deterministic; the only
//! randomness is a seeded nudge out of movement deadlocks.
//!
//! ## Crate Structure
//!
//! - [`classify`] - Unit classification into side/role buckets
//! - [`aggression`] - Strength comparison and the offense gate
//! - [`harvest`] - Worker assignment and harvest/return legs
//! - [`construction`] - Base and barracks placement
//! - [`production`] - Worker and army training
//! - [`engagement`] - Per-unit attack/evade/chase/regroup arbitration
//! - [`reservation`] - Tick-scoped cell claims
//! - [`ledger`] - Tick-scoped projected damage
//! - [`defense`] - Base isolation and defense rings
//! - [`budget`] - Wall-clock budget
//! - [`context`] - Shared tick state
//! - [`engine`] - Tick driver and [`engine::Agent`]
//! - [`config`] - Tuning knobs

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod aggression;
pub mod budget;
pub mod classify;
pub mod config;
pub mod construction;
pub mod context;
pub mod defense;
pub mod engagement;
pub mod engine;
pub mod harvest;
pub mod ledger;
pub mod production;
pub mod report;
pub mod reservation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggression::{AggressionGate, StrengthMetric};
    pub use crate::budget::{Clock, SteppingClock, SystemClock, TickBudget};
    pub use crate::classify::{Role, Roster, Side, SideRoster};
    pub use crate::config::{ConfigError, EngineConfig, MapProfile};
    pub use crate::context::{Collaborators, TickContext};
    pub use crate::engagement::{ChaseReason, Decision, EngagementState};
    pub use crate::engine::{run_tick, Agent, EngineState, TickInput, TickOutput};
    pub use crate::harvest::HarvestAssignments;
    pub use crate::report::TickReport;
}
