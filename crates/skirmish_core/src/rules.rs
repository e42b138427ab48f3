//! Action legality.
//!
//! The host simulation owns the real rules; the engine only asks whether a
//! proposed action would be accepted. [`StandardRules`] answers for the
//! usual grid-RTS rule set:
//! - Only idle units owned by a player may act; a no-op is always allowed
//! - Moves need a walkable, unoccupied neighbour
//! - Attacks need an enemy on a cell within Euclidean range
//! - Production needs the capability, a free cell and enough banked resources
//! - Harvest and return need an empty or loaded worker next to a field or own base

use crate::action::UnitAction;
use crate::grid::Direction;
use crate::snapshot::Snapshot;
use crate::stats::UnitTypeTable;
use crate::unit::{Unit, UnitKind};

/// Legality oracle consulted before any action is emitted.
pub trait ActionRules {
    /// Whether the host would accept `action` for `unit` in `snapshot`.
    fn is_allowed(&self, snapshot: &Snapshot, unit: &Unit, action: &UnitAction) -> bool;
}

/// Rules of the standard grid-RTS game.
#[derive(Debug, Clone, Default)]
pub struct StandardRules {
    table: UnitTypeTable,
}

impl StandardRules {
    /// Create rules over a unit table.
    #[must_use]
    pub const fn new(table: UnitTypeTable) -> Self {
        Self { table }
    }

    /// The unit table these rules consult.
    #[must_use]
    pub const fn table(&self) -> &UnitTypeTable {
        &self.table
    }

    fn neighbour<'s>(snapshot: &'s Snapshot, unit: &Unit, direction: Direction) -> Option<&'s Unit> {
        snapshot.unit_at(unit.position.step(direction))
    }
}

impl ActionRules for StandardRules {
    fn is_allowed(&self, snapshot: &Snapshot, unit: &Unit, action: &UnitAction) -> bool {
        if action.is_noop() {
            return true;
        }
        let Some(owner) = unit.owner else {
            return false;
        };
        if unit.is_busy() {
            return false;
        }
        let stats = self.table.get(unit.kind);

        match *action {
            UnitAction::Noop => true,
            UnitAction::Move(direction) => {
                stats.can_move() && snapshot.is_free(unit.position.step(direction))
            }
            UnitAction::Attack(target) => {
                stats.can_attack()
                    && unit.position.within_range(target, stats.attack_range)
                    && snapshot
                        .unit_at(target)
                        .is_some_and(|t| t.is_enemy_of(owner))
            }
            UnitAction::Produce { direction, kind } => {
                stats.can_produce(kind)
                    && snapshot.is_free(unit.position.step(direction))
                    && snapshot.banked(owner) >= self.table.get(kind).cost
            }
            UnitAction::Harvest(direction) => {
                stats.can_harvest()
                    && unit.cargo == 0
                    && Self::neighbour(snapshot, unit, direction)
                        .is_some_and(|t| t.kind == UnitKind::Resource)
            }
            UnitAction::Return(direction) => {
                stats.can_harvest()
                    && unit.cargo > 0
                    && Self::neighbour(snapshot, unit, direction)
                        .is_some_and(|t| t.kind == UnitKind::Base && t.is_owned_by(owner))
            }
        }
    }
}
