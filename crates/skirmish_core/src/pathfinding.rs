//! Single-step grid pathfinding using the A* algorithm.
//!
//! The engine never follows a full path: each tick it only needs the next
//! step, so [`StepFinder`] returns one [`Direction`]. Structures, resource
//! fields and walls block the whole search. Mobile units and cells already
//! claimed this tick only block the first step, since they will have moved
//! by the time the rest of the path is walked.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::grid::{Direction, Position};
use crate::snapshot::Snapshot;
use crate::unit::Unit;

/// What a unit is trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathGoal {
    /// Stand on this cell.
    Cell(Position),
    /// Stand orthogonally next to this cell.
    Adjacent(Position),
    /// Stand within Euclidean range of this cell.
    WithinRange(Position, i32),
}

impl PathGoal {
    /// Whether standing on `pos` satisfies the goal.
    #[must_use]
    pub const fn is_reached(&self, pos: Position) -> bool {
        match *self {
            Self::Cell(target) => pos.x == target.x && pos.y == target.y,
            Self::Adjacent(target) => pos.manhattan(target) == 1,
            Self::WithinRange(target, range) => pos.within_range(target, range),
        }
    }

    /// Admissible lower bound on the steps left from `pos`.
    #[must_use]
    pub fn heuristic(&self, pos: Position) -> i32 {
        match *self {
            Self::Cell(target) => pos.manhattan(target),
            Self::Adjacent(target) => (pos.manhattan(target) - 1).max(0),
            // Chebyshev distance to the target never exceeds the range
            // once inside it, and one step changes it by at most one.
            Self::WithinRange(target, range) => (pos.chebyshev(target) - range).max(0),
        }
    }

    /// The cell the goal is anchored on.
    #[must_use]
    pub const fn target(&self) -> Position {
        match *self {
            Self::Cell(target) | Self::Adjacent(target) | Self::WithinRange(target, _) => target,
        }
    }
}

/// Cells a step may not enter even though the snapshot shows them empty.
pub trait Occupancy {
    /// Whether `pos` is already claimed.
    fn is_blocked(&self, pos: Position) -> bool;
}

/// Occupancy with nothing claimed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unclaimed;

impl Occupancy for Unclaimed {
    fn is_blocked(&self, _pos: Position) -> bool {
        false
    }
}

impl Occupancy for BTreeSet<Position> {
    fn is_blocked(&self, pos: Position) -> bool {
        self.contains(&pos)
    }
}

/// Best-effort next step towards a goal.
pub trait StepFinder {
    /// The first step of a route from `unit` to `goal`.
    ///
    /// Returns `None` when the goal is already reached or no step makes
    /// progress. A returned step always leads onto a free, unclaimed cell.
    fn find_step(
        &self,
        snapshot: &Snapshot,
        unit: &Unit,
        goal: PathGoal,
        occupancy: &dyn Occupancy,
    ) -> Option<Direction>;
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: Position,
    /// f_score = g_score + heuristic (reversed in `Ord` for a min-heap)
    f_score: i32,
    /// Tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Convert coordinates to a tie-breaker value for deterministic ordering.
#[inline]
fn pos_to_tie_breaker(pos: Position) -> u64 {
    ((pos.y as u32 as u64) << 32) | u64::from(pos.x as u32)
}

/// A* over the four-neighbour grid, bounded by an expansion cap.
///
/// When the cap is hit or the goal is unreachable, the step towards the
/// explored cell closest to the goal is returned if it makes progress.
#[derive(Debug, Clone, Copy)]
pub struct AStarStepFinder {
    max_expansions: usize,
}

impl Default for AStarStepFinder {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl AStarStepFinder {
    /// Create a finder that expands at most `max_expansions` nodes per call.
    #[must_use]
    pub const fn new(max_expansions: usize) -> Self {
        Self { max_expansions }
    }

    /// Cells held by units that will not move out of the way.
    fn static_obstacles(snapshot: &Snapshot) -> HashSet<Position> {
        snapshot
            .units
            .iter()
            .filter(|u| u.kind.is_structure() || u.owner.is_none())
            .map(|u| u.position)
            .collect()
    }
}

impl StepFinder for AStarStepFinder {
    fn find_step(
        &self,
        snapshot: &Snapshot,
        unit: &Unit,
        goal: PathGoal,
        occupancy: &dyn Occupancy,
    ) -> Option<Direction> {
        let start = unit.position;
        if goal.is_reached(start) {
            return None;
        }

        let obstacles = Self::static_obstacles(snapshot);
        let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
        let mut g_score: HashMap<Position, i32> = HashMap::new();
        let mut first_step: HashMap<Position, Direction> = HashMap::new();
        // (heuristic, g, position) of the most promising cell seen so far
        let mut best: Option<(i32, i32, Position)> = None;
        let start_h = goal.heuristic(start);

        g_score.insert(start, 0);
        open_set.push(AStarNode {
            pos: start,
            f_score: start_h,
            tie_breaker: pos_to_tie_breaker(start),
        });

        let mut expansions = 0usize;
        while let Some(current) = open_set.pop() {
            let current_g = g_score.get(&current.pos).copied().unwrap_or(i32::MAX);
            // Stale heap entry
            if current.f_score > current_g.saturating_add(goal.heuristic(current.pos)) {
                continue;
            }

            if current.pos != start {
                if goal.is_reached(current.pos) {
                    return first_step.get(&current.pos).copied();
                }
                let h = goal.heuristic(current.pos);
                if best.map_or(true, |(best_h, best_g, _)| (h, current_g) < (best_h, best_g)) {
                    best = Some((h, current_g, current.pos));
                }
            }

            expansions += 1;
            if expansions > self.max_expansions {
                break;
            }

            for direction in Direction::ALL {
                let next = current.pos.step(direction);
                let passable = if current.pos == start {
                    snapshot.is_free(next) && !occupancy.is_blocked(next)
                } else {
                    snapshot.terrain.is_walkable(next) && !obstacles.contains(&next)
                };
                if !passable || next == start {
                    continue;
                }

                let step = if current.pos == start {
                    direction
                } else {
                    let Some(&step) = first_step.get(&current.pos) else {
                        continue;
                    };
                    step
                };

                let tentative_g = current_g + 1;
                if tentative_g < g_score.get(&next).copied().unwrap_or(i32::MAX) {
                    g_score.insert(next, tentative_g);
                    first_step.insert(next, step);
                    open_set.push(AStarNode {
                        pos: next,
                        f_score: tentative_g + goal.heuristic(next),
                        tie_breaker: pos_to_tie_breaker(next),
                    });
                }
            }
        }

        let (best_h, _, best_pos) = best?;
        if best_h < start_h {
            first_step.get(&best_pos).copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Terrain;
    use crate::unit::{PlayerId, UnitKind};

    fn light_at(snapshot: &mut Snapshot, id: u64, pos: Position) -> Unit {
        let unit = Unit::new(id, Some(PlayerId(0)), UnitKind::Light, pos, 4);
        snapshot.units.push(unit.clone());
        unit
    }

    #[test]
    fn test_straight_line_step() {
        let mut snapshot = Snapshot::new(0, Terrain::open(8, 8));
        let unit = light_at(&mut snapshot, 1, Position::new(1, 1));
        let finder = AStarStepFinder::default();
        let step = finder.find_step(
            &snapshot,
            &unit,
            PathGoal::Cell(Position::new(5, 1)),
            &Unclaimed,
        );
        assert_eq!(step, Some(Direction::Right));
    }

    #[test]
    fn test_routes_around_wall() {
        let terrain = Terrain::from_rows(&[".....", ".###.", ".....", "....."]).unwrap();
        let mut snapshot = Snapshot::new(0, terrain);
        let unit = light_at(&mut snapshot, 1, Position::new(2, 0));
        let finder = AStarStepFinder::default();
        let step = finder
            .find_step(
                &snapshot,
                &unit,
                PathGoal::Cell(Position::new(2, 2)),
                &Unclaimed,
            )
            .unwrap();
        assert!(matches!(step, Direction::Left | Direction::Right));
    }

    #[test]
    fn test_first_step_avoids_claimed_cells() {
        let mut snapshot = Snapshot::new(0, Terrain::open(8, 8));
        let unit = light_at(&mut snapshot, 1, Position::new(1, 1));
        let mut claimed = BTreeSet::new();
        claimed.insert(Position::new(2, 1));
        let finder = AStarStepFinder::default();
        let step = finder
            .find_step(
                &snapshot,
                &unit,
                PathGoal::Cell(Position::new(5, 1)),
                &claimed,
            )
            .unwrap();
        assert_ne!(step, Direction::Right);
        assert!(!claimed.contains(&unit.position.step(step)));
    }

    #[test]
    fn test_goal_already_reached() {
        let mut snapshot = Snapshot::new(0, Terrain::open(8, 8));
        let unit = light_at(&mut snapshot, 1, Position::new(1, 1));
        let finder = AStarStepFinder::default();
        assert_eq!(
            finder.find_step(
                &snapshot,
                &unit,
                PathGoal::Adjacent(Position::new(1, 2)),
                &Unclaimed
            ),
            None
        );
        assert_eq!(
            finder.find_step(
                &snapshot,
                &unit,
                PathGoal::WithinRange(Position::new(3, 3), 3),
                &Unclaimed
            ),
            None
        );
    }

    #[test]
    fn test_unreachable_goal_falls_back_to_progress() {
        // Target enclosed by walls; the closest reachable cell is still closer
        let terrain = Terrain::from_rows(&["......", "...###", "...#..", "...###"]).unwrap();
        let mut snapshot = Snapshot::new(0, terrain);
        let unit = light_at(&mut snapshot, 1, Position::new(0, 2));
        let finder = AStarStepFinder::default();
        let step = finder.find_step(
            &snapshot,
            &unit,
            PathGoal::Cell(Position::new(5, 2)),
            &Unclaimed,
        );
        assert!(step.is_some());
    }

    #[test]
    fn test_boxed_in_unit_has_no_step() {
        let mut snapshot = Snapshot::new(0, Terrain::open(3, 3));
        let unit = light_at(&mut snapshot, 1, Position::new(1, 1));
        for (id, pos) in [(2, (1, 0)), (3, (0, 1)), (4, (2, 1)), (5, (1, 2))] {
            snapshot.units.push(Unit::new(
                id,
                None,
                UnitKind::Resource,
                Position::new(pos.0, pos.1),
                5,
            ));
        }
        let finder = AStarStepFinder::default();
        assert_eq!(
            finder.find_step(
                &snapshot,
                &unit,
                PathGoal::Cell(Position::new(0, 0)),
                &Unclaimed
            ),
            None
        );
    }
}
