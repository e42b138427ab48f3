//! Primitive unit actions and the per-tick joint action.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Position};
use crate::unit::{UnitId, UnitKind};

/// One primitive action for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAction {
    /// Do nothing this tick.
    Noop,
    /// Step one cell.
    Move(Direction),
    /// Attack whatever stands on a cell.
    Attack(Position),
    /// Train or build a unit into the adjacent cell.
    Produce {
        /// Placement side.
        direction: Direction,
        /// What to produce.
        kind: UnitKind,
    },
    /// Harvest the adjacent resource field.
    Harvest(Direction),
    /// Return carried resources to the adjacent base.
    Return(Direction),
}

impl UnitAction {
    /// The cell this action claims for the rest of the tick, if any.
    ///
    /// Moves claim the destination, productions the placement cell.
    #[must_use]
    pub fn claimed_cell(&self, from: Position) -> Option<Position> {
        match *self {
            Self::Move(direction) | Self::Produce { direction, .. } => Some(from.step(direction)),
            _ => None,
        }
    }

    /// Whether this is the no-op action.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

/// The complete unit-id → action mapping for one tick.
///
/// Holds at most one action per unit; any unit missing from the map is a
/// no-op. Iteration is in unit-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointAction {
    actions: BTreeMap<UnitId, UnitAction>,
}

impl JointAction {
    /// Create an empty joint action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action. Returns `false` (and keeps the first) if the unit
    /// already has one.
    pub fn insert(&mut self, unit: UnitId, action: UnitAction) -> bool {
        if self.actions.contains_key(&unit) {
            return false;
        }
        self.actions.insert(unit, action);
        true
    }

    /// Replace an already recorded action.
    pub fn overwrite(&mut self, unit: UnitId, action: UnitAction) {
        self.actions.insert(unit, action);
    }

    /// Whether the unit already has an action this tick.
    #[must_use]
    pub fn contains(&self, unit: UnitId) -> bool {
        self.actions.contains_key(&unit)
    }

    /// Action for a unit, defaulting to no-op.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> UnitAction {
        self.actions.get(&unit).copied().unwrap_or(UnitAction::Noop)
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate in unit-id order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, UnitAction)> + '_ {
        self.actions.iter().map(|(id, action)| (*id, *action))
    }
}
