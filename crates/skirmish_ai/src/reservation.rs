//! Movement reservation table.
//!
//! Every accepted move or placement claims its destination cell before the
//! next unit is evaluated. A cell can be claimed once per tick; the table
//! only grows and is dropped with the tick context.

use std::collections::BTreeSet;

use skirmish_core::pathfinding::Occupancy;
use skirmish_core::prelude::*;

/// Cells claimed this tick.
#[derive(Debug, Clone, Default)]
pub struct ReservationTable {
    cells: BTreeSet<Position>,
}

impl ReservationTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with destinations of moves and productions still in progress,
    /// on both sides.
    #[must_use]
    pub fn seeded(snapshot: &Snapshot) -> Self {
        let mut table = Self::new();
        for unit in &snapshot.units {
            if let Some(pending) = unit.pending {
                if let Some(cell) = pending.action.claimed_cell(unit.position) {
                    table.cells.insert(cell);
                }
            }
        }
        table
    }

    /// Claim a cell. Returns `false` if it was already claimed.
    pub fn reserve(&mut self, cell: Position) -> bool {
        self.cells.insert(cell)
    }

    /// Whether a cell is claimed.
    #[must_use]
    pub fn is_reserved(&self, cell: Position) -> bool {
        self.cells.contains(&cell)
    }

    /// Walkable, unoccupied in the snapshot and unclaimed.
    #[must_use]
    pub fn is_free(&self, snapshot: &Snapshot, cell: Position) -> bool {
        snapshot.is_free(cell) && !self.is_reserved(cell)
    }

    /// Number of claimed cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Occupancy for ReservationTable {
    fn is_blocked(&self, pos: Position) -> bool {
        self.is_reserved(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_claimed_once() {
        let mut table = ReservationTable::new();
        assert!(table.reserve(Position::new(1, 1)));
        assert!(!table.reserve(Position::new(1, 1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_seeded_with_pending_moves_and_productions() {
        let mut s = Snapshot::new(0, Terrain::open(4, 4));
        let mut light = Unit::new(1, Some(PlayerId(1)), UnitKind::Light, Position::new(0, 0), 4);
        light.pending = Some(PendingAction {
            action: UnitAction::Move(Direction::Right),
            started_at: 0,
            eta: 4,
        });
        let mut base = Unit::new(2, Some(PlayerId(0)), UnitKind::Base, Position::new(2, 2), 10);
        base.pending = Some(PendingAction {
            action: UnitAction::Produce {
                direction: Direction::Up,
                kind: UnitKind::Worker,
            },
            started_at: 0,
            eta: 40,
        });
        s.units.push(light);
        s.units.push(base);

        let table = ReservationTable::seeded(&s);
        assert!(table.is_reserved(Position::new(1, 0)));
        assert!(table.is_reserved(Position::new(2, 1)));
        assert!(!table.is_free(&s, Position::new(1, 0)));
        assert!(table.is_free(&s, Position::new(3, 3)));
        assert!(!table.is_free(&s, Position::new(2, 2)));
    }
}
