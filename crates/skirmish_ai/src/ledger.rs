//! Projected damage queued against enemy units this tick.

use std::collections::{BTreeMap, BTreeSet};

use skirmish_core::prelude::*;
use tracing::debug;

/// Target id → damage already committed to it this tick.
///
/// Each attack projects the attacker's average damage. Once the projection
/// reaches a target's hitpoints the target is effectively dead.
#[derive(Debug, Clone, Default)]
pub struct DamageLedger {
    projected: BTreeMap<UnitId, i32>,
    dead: BTreeSet<UnitId>,
}

impl DamageLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with attacks our units are still executing.
    ///
    /// An attack aimed at an empty cell is skipped.
    #[must_use]
    pub fn seeded(snapshot: &Snapshot, me: PlayerId, table: &UnitTypeTable) -> Self {
        let mut ledger = Self::new();
        for unit in snapshot.units_of(me) {
            let Some(PendingAction {
                action: UnitAction::Attack(cell),
                ..
            }) = unit.pending
            else {
                continue;
            };
            match snapshot.unit_at(cell) {
                Some(target) => {
                    ledger.register(table.get(unit.kind), target);
                }
                None => {
                    debug!(unit = %unit.id, cell = %cell, "in-progress attack on empty cell, skipped");
                }
            }
        }
        ledger
    }

    /// Queue one attack by a unit with `attacker` stats against `target`.
    ///
    /// Returns `true` if the target is now effectively dead.
    pub fn register(&mut self, attacker: &UnitStats, target: &Unit) -> bool {
        let total = self.projected.entry(target.id).or_insert(0);
        *total += attacker.average_damage();
        if *total >= target.hitpoints {
            self.dead.insert(target.id);
            true
        } else {
            false
        }
    }

    /// Damage projected against a unit so far.
    #[must_use]
    pub fn projected(&self, target: UnitId) -> i32 {
        self.projected.get(&target).copied().unwrap_or(0)
    }

    /// Hitpoints left once every queued attack lands.
    #[must_use]
    pub fn remaining(&self, target: &Unit) -> i32 {
        target.hitpoints - self.projected(target.id)
    }

    /// Whether queued attacks are expected to kill the unit.
    #[must_use]
    pub fn is_dead(&self, target: UnitId) -> bool {
        self.dead.contains(&target)
    }

    /// Number of effectively dead targets.
    #[must_use]
    pub fn dead_count(&self) -> usize {
        self.dead.len()
    }
}
