//! Resource allocation.
//!
//! Idle workers are assigned to a base, at most `harvesters_per_base` per
//! base, and then alternate between two legs on their own:
//! - No cargo: walk to the nearest resource field and harvest it
//! - Cargo: walk to the assigned base and return it
//!
//! An assignment ends when the worker or its base disappears, or when an
//! enemy comes within melee alert distance; the worker is then handed to
//! the engagement arbiter.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use skirmish_core::prelude::*;
use tracing::debug;

use crate::classify::{nearest, Roster};
use crate::context::TickContext;

/// Worker id → base id. Persists across ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HarvestAssignments {
    workers: BTreeMap<UnitId, UnitId>,
}

impl HarvestAssignments {
    /// Drop entries whose worker or base no longer exists.
    pub fn prune(&mut self, roster: &Roster<'_>) {
        let workers: BTreeSet<UnitId> = roster.own.workers().map(|u| u.id).collect();
        let bases: BTreeSet<UnitId> = roster.own.bases.iter().map(|u| u.id).collect();
        self.workers
            .retain(|worker, base| workers.contains(worker) && bases.contains(base));
    }

    /// Workers currently assigned to a base.
    #[must_use]
    pub fn count_for(&self, base: UnitId) -> usize {
        self.workers.values().filter(|b| **b == base).count()
    }

    /// The base a worker harvests for.
    #[must_use]
    pub fn base_of(&self, worker: UnitId) -> Option<UnitId> {
        self.workers.get(&worker).copied()
    }

    /// Whether a worker has an assignment.
    #[must_use]
    pub fn is_assigned(&self, worker: UnitId) -> bool {
        self.workers.contains_key(&worker)
    }

    /// Assign a worker unless the base is already at `quota`.
    pub fn assign(&mut self, worker: UnitId, base: UnitId, quota: usize) -> bool {
        if self.is_assigned(worker) || self.count_for(base) >= quota {
            return false;
        }
        self.workers.insert(worker, base);
        true
    }

    /// End a worker's assignment.
    pub fn release(&mut self, worker: UnitId) {
        self.workers.remove(&worker);
    }

    /// Number of assigned workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether nobody is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Iterate `(worker, base)` pairs in worker order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.workers.iter().map(|(w, b)| (*w, *b))
    }
}

/// Whether an enemy stands within melee alert distance of `unit`.
#[must_use]
pub fn is_threatened(ctx: &TickContext<'_>, unit: &Unit) -> bool {
    nearest(unit.position, ctx.roster.alive_enemies.iter().copied())
        .is_some_and(|e| e.position.manhattan(unit.position) <= ctx.config.melee_alert_distance)
}

/// `dist(worker, nearest unsaturated base) + dist(worker, nearest owned resource)`.
fn harvest_score<'a>(
    ctx: &TickContext<'a>,
    assignments: &HarvestAssignments,
    worker: &Unit,
) -> Option<(i32, &'a Unit)> {
    let quota = ctx.config.harvesters_per_base;
    let open_bases = ctx
        .roster
        .own
        .bases
        .iter()
        .copied()
        .filter(|b| assignments.count_for(b.id) < quota);
    let base = nearest(worker.position, open_bases)?;
    let resource = nearest(worker.position, ctx.roster.owned_resources.iter().copied())?;
    let score = worker.position.manhattan(base.position) + worker.position.manhattan(resource.position);
    Some((score, base))
}

/// Assign idle workers to bases below quota, best score first.
pub fn assign_workers(ctx: &mut TickContext<'_>, assignments: &mut HarvestAssignments) {
    let quota = ctx.config.harvesters_per_base;
    loop {
        let candidates: Vec<&Unit> = ctx
            .roster
            .own
            .workers_idle
            .iter()
            .copied()
            .filter(|w| !assignments.is_assigned(w.id) && !ctx.has_action(w.id))
            .filter(|w| !is_threatened(ctx, w))
            .collect();
        let best = candidates
            .into_iter()
            .filter_map(|w| harvest_score(ctx, assignments, w).map(|(s, base)| (s, w, base)))
            .min_by_key(|(score, worker, _)| (*score, worker.id));
        let Some((score, worker, base)) = best else {
            break;
        };
        if !assignments.assign(worker.id, base.id, quota) {
            break;
        }
        debug!(worker = %worker.id, base = %base.id, score, "harvester assigned");
        ctx.report.harvesters_assigned += 1;
    }
}

/// Drive every idle assigned worker along its current leg.
///
/// Returns the idle workers left for the engagement arbiter: unassigned
/// ones and those released because an enemy came too close.
pub fn drive_workers<'a>(
    ctx: &mut TickContext<'a>,
    assignments: &mut HarvestAssignments,
) -> Vec<&'a Unit> {
    let workers = ctx.roster.own.workers_idle.clone();
    let mut released = Vec::new();

    for worker in workers {
        if ctx.has_action(worker.id) {
            continue;
        }
        let Some(base_id) = assignments.base_of(worker.id) else {
            released.push(worker);
            continue;
        };
        if is_threatened(ctx, worker) {
            debug!(worker = %worker.id, "enemy close, harvester released to combat");
            assignments.release(worker.id);
            ctx.report.harvesters_released += 1;
            released.push(worker);
            continue;
        }
        if ctx.budget_exhausted() {
            ctx.fallback(worker);
            continue;
        }
        if !drive_leg(ctx, worker, base_id) {
            ctx.hold(worker);
        }
    }
    released
}

/// Harvest or return if adjacent, otherwise step towards the target.
fn drive_leg(ctx: &mut TickContext<'_>, worker: &Unit, base_id: UnitId) -> bool {
    let (target, leg) = if worker.cargo == 0 {
        let Some(field) = nearest(worker.position, ctx.roster.resources.iter().copied()) else {
            return false;
        };
        (field.position, UnitAction::Harvest as fn(Direction) -> UnitAction)
    } else {
        let Some(base) = ctx.snapshot.unit(base_id) else {
            return false;
        };
        (base.position, UnitAction::Return as fn(Direction) -> UnitAction)
    };

    let issued = match worker.position.direction_to(target) {
        Some(direction) => ctx.issue(worker, leg(direction)),
        None => ctx.move_toward(worker, PathGoal::Adjacent(target)),
    };
    if issued {
        ctx.report.harvest_actions += 1;
    }
    issued
}
