//! Construction planning.
//!
//! Two jobs, in this order:
//! - Rebuild a base when we hold none
//! - Place barracks around our bases, up to the configured cap
//!
//! Barracks sites are scored in tenths of a point. A good site is far from
//! other barracks, does not hem in resources or bases, cannot be reached by
//! the enemy before a first unit is out, and is close to its builder.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use skirmish_core::prelude::*;
use tracing::debug;

use crate::classify::nearest;
use crate::context::TickContext;
use crate::harvest::is_threatened;

/// A resource field or base next to the site.
const BLOCK_NEAR: i32 = 40;
/// A resource field or base two cells from the site (isolated bases only).
const BLOCK_FAR: i32 = 10;
/// A wall or the map edge next to the site.
const BLOCK_WALL: i32 = 2;
/// Danger multiplier.
const DANGER_SCALE: i32 = 20;
/// Bonus when the builder stands between the enemy and the site.
const SHIELD_BONUS: i32 = 30;
/// Candidate radius around each base.
const SITE_RADIUS: i32 = 2;

/// A scored barracks site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteChoice {
    /// Where the barracks goes.
    pub site: Position,
    /// Who builds it.
    pub builder: UnitId,
    /// Score in tenths.
    pub score: i32,
}

/// Run the planner for this tick.
pub fn plan(ctx: &mut TickContext<'_>) {
    plan_base(ctx);
    plan_barracks(ctx);
}

/// Idle workers that may still be given an order this tick.
fn free_workers<'a>(ctx: &TickContext<'a>) -> Vec<&'a Unit> {
    ctx.roster
        .own
        .workers_idle
        .iter()
        .copied()
        .filter(|w| !ctx.has_action(w.id))
        .collect()
}

/// Place a base when we have none, workers and visible resources.
pub fn plan_base(ctx: &mut TickContext<'_>) {
    if !ctx.roster.own.bases.is_empty() || ctx.roster.resources.is_empty() {
        return;
    }
    let cost = ctx.table.get(UnitKind::Base).cost;
    if ctx.available() < cost {
        return;
    }
    let resources = ctx.roster.resources.clone();
    let Some(builder) = free_workers(ctx).into_iter().min_by_key(|w| {
        let field = nearest(w.position, resources.iter().copied());
        (field.map_or(i32::MAX, |r| r.position.manhattan(w.position)), w.id)
    }) else {
        return;
    };

    for direction in Direction::ALL {
        let placed = ctx.issue(
            builder,
            UnitAction::Produce {
                direction,
                kind: UnitKind::Base,
            },
        );
        if placed {
            debug!(builder = %builder.id, ?direction, "placing new base");
            ctx.report.construction_orders += 1;
            return;
        }
    }
}

/// Cells where barracks are standing, being built, or were queued this tick.
fn barracks_cells(ctx: &TickContext<'_>, queued: &[Position]) -> Vec<Position> {
    let building = ctx.roster.own.workers_busy.iter().filter_map(|w| {
        let pending = w.pending?;
        match pending.action {
            UnitAction::Produce {
                kind: UnitKind::Barracks,
                ..
            } => pending.action.claimed_cell(w.position),
            _ => None,
        }
    });
    ctx.roster
        .own
        .barracks
        .iter()
        .map(|b| b.position)
        .chain(building)
        .chain(queued.iter().copied())
        .collect()
}

/// Candidate sites, each tagged with the first base (by id) it belongs to.
fn candidate_sites(ctx: &TickContext<'_>) -> BTreeMap<Position, UnitId> {
    let resources: Vec<Position> = ctx.roster.resources.iter().map(|r| r.position).collect();
    let mut sites = BTreeMap::new();
    for base in &ctx.roster.own.bases {
        for cell in base.position.manhattan_disc(SITE_RADIUS) {
            let valid = ctx.reservations.is_free(ctx.snapshot, cell)
                && resources.iter().all(|r| r.chebyshev(cell) > 1);
            if valid {
                sites.entry(cell).or_insert(base.id);
            }
        }
    }
    sites
}

/// Penalty for crowding resources, bases and walls around `site`.
#[must_use]
pub fn blocking_penalty(snapshot: &Snapshot, site: Position, outer_ring: bool) -> i32 {
    let crowds = |cell: Position| {
        snapshot
            .unit_at(cell)
            .is_some_and(|u| matches!(u.kind, UnitKind::Resource | UnitKind::Base))
    };
    let mut penalty = 0;
    for cell in site.manhattan_ring(1) {
        if !snapshot.terrain.is_walkable(cell) {
            penalty += BLOCK_WALL;
        } else if crowds(cell) {
            penalty += BLOCK_NEAR;
        }
    }
    if outer_ring {
        penalty += site
            .manhattan_ring(2)
            .into_iter()
            .filter(|cell| snapshot.terrain.in_bounds(*cell) && crowds(*cell))
            .count() as i32
            * BLOCK_FAR;
    }
    penalty
}

/// Whether `between` lies inside the box spanned by `a` and `b`.
fn in_box(between: Position, a: Position, b: Position) -> bool {
    (a.x.min(b.x)..=a.x.max(b.x)).contains(&between.x)
        && (a.y.min(b.y)..=a.y.max(b.y)).contains(&between.y)
}

/// Danger term: positive when the nearest mobile enemy can arrive before a
/// barracks there has trained its first unit.
fn danger(ctx: &TickContext<'_>, site: Position, builder: &Unit) -> i32 {
    let mobile = ctx
        .roster
        .alive_enemies
        .iter()
        .copied()
        .filter(|e| ctx.stats(e).can_move());
    let Some(enemy) = nearest(site, mobile) else {
        return 0;
    };
    let travel = (site.manhattan(enemy.position) * ctx.stats(enemy).move_time).max(1);
    let combined = ctx.table.get(UnitKind::Barracks).produce_time
        + ctx.table.get(UnitKind::Heavy).produce_time;
    if travel >= combined {
        return 0;
    }
    let penalty = DANGER_SCALE * combined / travel;
    if in_box(builder.position, site, enemy.position) {
        penalty - SHIELD_BONUS
    } else {
        penalty
    }
}

/// Score one site for one builder, in tenths.
#[must_use]
pub fn score_site(
    ctx: &TickContext<'_>,
    site: Position,
    builder: &Unit,
    existing: &[Position],
    isolated: bool,
) -> i32 {
    if isolated {
        return -blocking_penalty(ctx.snapshot, site, true);
    }
    let deserted = existing
        .iter()
        .map(|b| b.manhattan(site))
        .min()
        .map_or(0, |d| 10 * d / 2);
    let walk = 10 * builder.position.manhattan(site) / 2;
    deserted - blocking_penalty(ctx.snapshot, site, false) - danger(ctx, site, builder) - walk
}

/// Best site and builder, or `None` if nothing beats the floor.
///
/// `queued` holds sites already ordered this tick.
#[must_use]
pub fn best_site(ctx: &TickContext<'_>, queued: &[Position]) -> Option<SiteChoice> {
    let builders: Vec<&Unit> = free_workers(ctx)
        .into_iter()
        .filter(|w| !is_threatened(ctx, w))
        .collect();
    if builders.is_empty() {
        return None;
    }
    let existing = barracks_cells(ctx, queued);
    candidate_sites(ctx)
        .into_iter()
        .filter(|(site, _)| !queued.contains(site))
        .filter_map(|(site, base)| {
            let builder = nearest(site, builders.iter().copied())?;
            let score = score_site(ctx, site, builder, &existing, ctx.isolated.contains(&base));
            Some(SiteChoice {
                site,
                builder: builder.id,
                score,
            })
        })
        .filter(|choice| choice.score > ctx.config.site_score_floor)
        .max_by_key(|choice| (choice.score, Reverse(choice.site)))
}

/// Place or walk towards barracks sites.
pub fn plan_barracks(ctx: &mut TickContext<'_>) {
    let cost = ctx.table.get(UnitKind::Barracks).cost;
    let mut queued: Vec<Position> = Vec::new();

    for attempt in 0..ctx.config.build_attempts {
        if ctx.budget_exhausted() {
            break;
        }
        if barracks_cells(ctx, &queued).len() >= ctx.config.barracks_cap {
            break;
        }
        if ctx.available() - 1 < cost {
            break;
        }
        let Some(choice) = best_site(ctx, &queued) else {
            break;
        };
        let Some(builder) = ctx.snapshot.unit(choice.builder) else {
            break;
        };

        let ordered = match builder.position.direction_to(choice.site) {
            Some(direction) => ctx.issue(
                builder,
                UnitAction::Produce {
                    direction,
                    kind: UnitKind::Barracks,
                },
            ),
            None => {
                let walking = ctx.move_toward(builder, PathGoal::Adjacent(choice.site));
                if walking {
                    ctx.earmark(cost);
                }
                walking
            }
        };
        if !ordered {
            debug!(attempt, site = %choice.site, "barracks order rejected");
            break;
        }
        debug!(
            attempt,
            site = %choice.site,
            builder = %choice.builder,
            score = choice.score,
            "barracks ordered"
        );
        queued.push(choice.site);
        ctx.report.construction_orders += 1;
    }
}
