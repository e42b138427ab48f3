//! Per-tick decision counters.

use serde::{Deserialize, Serialize};

/// What the engine decided in one tick, for logs and the headless runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Snapshot tick.
    pub tick: u64,
    /// Our combat strength.
    pub my_strength: i32,
    /// Their combat strength.
    pub enemy_strength: i32,
    /// Offense gate.
    pub commit: bool,
    /// Gate forced open, every worker fights.
    pub all_in: bool,

    // === Economy ===
    /// Workers newly assigned to a base this tick.
    pub harvesters_assigned: u32,
    /// Harvesters pulled into combat this tick.
    pub harvesters_released: u32,
    /// Harvest or return legs issued.
    pub harvest_actions: u32,
    /// Bases and barracks placed or walked to.
    pub construction_orders: u32,
    /// Units queued for training.
    pub trained: u32,

    // === Combat ===
    /// Attack decisions.
    pub attacks: u32,
    /// Evade decisions.
    pub evades: u32,
    /// Chase decisions.
    pub chases: u32,
    /// Regroup decisions.
    pub regroups: u32,
    /// Idle decisions.
    pub idles: u32,
    /// Enemies predicted dead by queued damage.
    pub effectively_dead: u32,

    // === Degradation ===
    /// Units resolved by the budget fallback.
    pub fallbacks: u32,
    /// Random steps out of a movement deadlock.
    pub nudges: u32,
    /// Actions replaced by a no-op in the final legality sweep.
    pub sweep_rejections: u32,
    /// Whether the wall-clock budget ran out.
    pub budget_exhausted: bool,
}

impl TickReport {
    /// Fresh report for a tick.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }
}
