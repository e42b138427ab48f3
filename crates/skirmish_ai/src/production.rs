//! Production scheduling.
//!
//! Bases train workers, barracks train combat units. New units spawn on the
//! free adjacent cell closest to the nearest enemy.

use skirmish_core::prelude::*;
use tracing::debug;

use crate::classify::nearest;
use crate::context::TickContext;

/// Spawn sides in evaluation order. The first wins ties.
const SPAWN_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Map width up to which every base trains workers non-stop.
const SMALL_MAP_WIDTH: u32 = 8;

/// Run production for this tick: bases first, then barracks.
pub fn schedule(ctx: &mut TickContext<'_>) {
    train_workers(ctx);
    train_army(ctx);
}

/// Free, unreserved side of `producer` closest to the nearest enemy.
#[must_use]
pub fn spawn_direction(ctx: &TickContext<'_>, producer: &Unit) -> Option<Direction> {
    SPAWN_ORDER
        .into_iter()
        .filter(|d| ctx.reservations.is_free(ctx.snapshot, producer.position.step(*d)))
        .min_by_key(|d| {
            let cell = producer.position.step(*d);
            nearest(cell, ctx.roster.alive_enemies.iter().copied())
                .map_or(0, |e| e.position.manhattan(cell))
        })
}

/// Queue one unit of `kind` at `producer`.
fn train(ctx: &mut TickContext<'_>, producer: &Unit, kind: UnitKind) -> bool {
    let Some(direction) = spawn_direction(ctx, producer) else {
        return false;
    };
    let queued = ctx.issue(producer, UnitAction::Produce { direction, kind });
    if queued {
        debug!(producer = %producer.id, ?kind, ?direction, "training");
        ctx.report.trained += 1;
    }
    queued
}

/// Workers alive or already in production.
fn worker_count(ctx: &TickContext<'_>) -> usize {
    let producing = ctx
        .roster
        .own
        .bases
        .iter()
        .filter(|b| {
            matches!(
                b.pending.map(|p| p.action),
                Some(UnitAction::Produce {
                    kind: UnitKind::Worker,
                    ..
                })
            )
        })
        .count();
    ctx.roster.own.workers_idle.len() + ctx.roster.own.workers_busy.len() + producing
}

/// Bases train while we are below the per-base worker target or rich.
///
/// On small maps a connected base trains every time it is idle.
fn train_workers(ctx: &mut TickContext<'_>) {
    let bases = ctx.roster.own.bases.clone();
    let target = ctx.config.harvesters_per_base * bases.len();
    let small_map = ctx.snapshot.width() <= SMALL_MAP_WIDTH;
    let mut workers = worker_count(ctx);

    for base in bases {
        if base.is_busy() {
            continue;
        }
        let eager = small_map && !ctx.isolated.contains(&base.id);
        let wanted = eager || workers < target || ctx.available() >= ctx.config.worker_surplus_bank;
        if wanted && train(ctx, base, UnitKind::Worker) {
            workers += 1;
        }
    }
}

/// Heavies until the threshold, ranged after that or once we were walled in.
#[must_use]
pub fn army_kind(ctx: &TickContext<'_>) -> UnitKind {
    if ctx.roster.own.combat_count(UnitKind::Heavy) > ctx.config.heavy_threshold || ctx.ever_isolated {
        UnitKind::Ranged
    } else {
        UnitKind::Heavy
    }
}

fn train_army(ctx: &mut TickContext<'_>) {
    let kind = army_kind(ctx);
    let barracks = ctx.roster.own.barracks.clone();
    for building in barracks {
        if !building.is_busy() {
            train(ctx, building, kind);
        }
    }
}

