//! Base isolation and defense rings.
//!
//! A base is *isolated* when no enemy unit can be reached from it by a
//! flood fill over open ground (resource fields block the fill). Whether a
//! base was ever isolated is remembered across ticks: it switches the
//! barracks to ranged production and changes how sites are scored.
//!
//! Defense rings are the cells at the map's defense distance (Chebyshev)
//! around each base, minus cells touching a resource field. Ranged units
//! use a ring one cell tighter.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use skirmish_core::prelude::*;

use crate::classify::{nearest, Roster};

/// Bases that have ever been found isolated. Persists across ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsolationMemory {
    bases: BTreeSet<UnitId>,
    any: bool,
}

impl IsolationMemory {
    /// Record this tick's observation for a base.
    pub fn observe(&mut self, base: UnitId, isolated: bool) {
        if isolated {
            self.bases.insert(base);
            self.any = true;
        }
    }

    /// Whether this base was ever isolated.
    #[must_use]
    pub fn was_isolated(&self, base: UnitId) -> bool {
        self.bases.contains(&base)
    }

    /// Whether any of our bases, alive or not, was ever isolated.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.any
    }

    /// Forget bases that no longer exist. The `any` flag is kept.
    pub fn prune(&mut self, alive: &BTreeSet<UnitId>) {
        self.bases.retain(|id| alive.contains(id));
    }
}

/// Flood fill from `base` looking for an enemy of `me`.
///
/// With no enemies on the map there is nothing to be isolated from, so the
/// base counts as connected.
#[must_use]
pub fn is_isolated(snapshot: &Snapshot, base: &Unit, me: PlayerId) -> bool {
    if !snapshot.units.iter().any(|u| u.is_enemy_of(me)) {
        return false;
    }
    let occupants: BTreeMap<Position, &Unit> =
        snapshot.units.iter().map(|u| (u.position, u)).collect();

    let mut visited: HashSet<Position> = HashSet::new();
    let mut frontier = VecDeque::new();
    visited.insert(base.position);
    frontier.push_back(base.position);

    while let Some(pos) = frontier.pop_front() {
        if occupants.get(&pos).is_some_and(|u| u.is_enemy_of(me)) {
            return false;
        }
        for next in pos.neighbours() {
            if !snapshot.terrain.is_walkable(next) || visited.contains(&next) {
                continue;
            }
            if occupants
                .get(&next)
                .is_some_and(|u| u.kind == UnitKind::Resource)
            {
                continue;
            }
            visited.insert(next);
            frontier.push_back(next);
        }
    }
    true
}

/// Ring cells around a base at Chebyshev `distance`, in position order.
#[must_use]
pub fn ring_cells(snapshot: &Snapshot, center: Position, distance: i32) -> Vec<Position> {
    if distance <= 0 {
        return Vec::new();
    }
    let resources: Vec<Position> = snapshot
        .units
        .iter()
        .filter(|u| u.kind == UnitKind::Resource)
        .map(|u| u.position)
        .collect();
    let mut cells: Vec<Position> = snapshot
        .terrain
        .positions()
        .filter(|p| p.chebyshev(center) == distance)
        .filter(|p| resources.iter().all(|r| r.chebyshev(*p) > 1))
        .collect();
    cells.sort();
    cells
}

/// Defense rings of every own base for one tick.
#[derive(Debug, Clone, Default)]
pub struct DefenseRings {
    melee: BTreeMap<UnitId, Vec<Position>>,
    ranged: BTreeMap<UnitId, Vec<Position>>,
}

impl DefenseRings {
    /// Build rings for all of our bases.
    #[must_use]
    pub fn build(snapshot: &Snapshot, roster: &Roster<'_>, distance: i32) -> Self {
        let mut rings = Self::default();
        for base in &roster.own.bases {
            rings
                .melee
                .insert(base.id, ring_cells(snapshot, base.position, distance));
            rings
                .ranged
                .insert(base.id, ring_cells(snapshot, base.position, distance - 1));
        }
        rings
    }

    /// The ring a unit of the given range guards around a base.
    #[must_use]
    pub fn ring(&self, base: UnitId, attack_range: i32) -> &[Position] {
        let rings = if attack_range > 1 {
            &self.ranged
        } else {
            &self.melee
        };
        rings.get(&base).map(Vec::as_slice).unwrap_or_default()
    }

    /// Where a guarding unit should stand.
    ///
    /// Picks the ring cell of the unit's nearest base that is closest to
    /// the enemy nearest that base, skipping cells an ally already holds.
    /// Returns `None` when there is nothing to guard or the unit already
    /// holds a cell at least as good.
    #[must_use]
    pub fn station_for(
        &self,
        snapshot: &Snapshot,
        roster: &Roster<'_>,
        unit: &Unit,
        attack_range: i32,
    ) -> Option<Position> {
        let me = unit.owner?;
        let base = nearest(unit.position, roster.own.bases.iter().copied())?;
        let enemy = nearest(base.position, roster.alive_enemies.iter().copied())?;
        let ring = self.ring(base.id, attack_range);

        let best = ring
            .iter()
            .copied()
            .filter(|cell| {
                *cell == unit.position
                    || !snapshot.unit_at(*cell).is_some_and(|u| u.is_owned_by(me))
            })
            .min_by_key(|cell| (cell.manhattan(enemy.position), *cell))?;

        if ring.contains(&unit.position)
            && best.manhattan(enemy.position) >= unit.position.manhattan(enemy.position)
        {
            return None;
        }
        Some(best)
    }
}
