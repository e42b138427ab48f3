//! Units as they appear in a snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::UnitAction;
use crate::grid::Position;

/// Stable unit identifier assigned by the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Player slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The other player of a two-player match.
    #[must_use]
    pub const fn opponent(self) -> Self {
        Self(if self.0 == 0 { 1 } else { 0 })
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// The seven unit types of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Harvests, builds and fights weakly.
    Worker,
    /// Stockpile; trains workers.
    Base,
    /// Trains combat units.
    Barracks,
    /// Long range, fragile.
    Ranged,
    /// Slow, hard hitting.
    Heavy,
    /// Fast melee.
    Light,
    /// Neutral harvestable field.
    Resource,
}

impl UnitKind {
    /// Every kind, in table order.
    pub const ALL: [Self; 7] = [
        Self::Worker,
        Self::Base,
        Self::Barracks,
        Self::Ranged,
        Self::Heavy,
        Self::Light,
        Self::Resource,
    ];

    /// Non-worker units that fight.
    #[must_use]
    pub const fn is_combat(self) -> bool {
        matches!(self, Self::Ranged | Self::Heavy | Self::Light)
    }

    /// Immobile structures.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Base | Self::Barracks)
    }
}

/// An action the host has already accepted and is still executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingAction {
    /// The action being executed.
    pub action: UnitAction,
    /// Tick at which execution started.
    pub started_at: u64,
    /// Ticks remaining until it completes, as of the snapshot.
    pub eta: u32,
}

/// A unit as observed in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Host-assigned identifier.
    pub id: UnitId,
    /// Owning player, `None` for neutral resources.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Unit type.
    pub kind: UnitKind,
    /// Grid cell.
    pub position: Position,
    /// Current hitpoints.
    pub hitpoints: i32,
    /// Carried resources for workers, remaining amount for resource fields.
    #[serde(default)]
    pub cargo: i32,
    /// Action in progress, if any.
    #[serde(default)]
    pub pending: Option<PendingAction>,
}

impl Unit {
    /// Create an idle unit.
    #[must_use]
    pub fn new(
        id: u64,
        owner: Option<PlayerId>,
        kind: UnitKind,
        position: Position,
        hitpoints: i32,
    ) -> Self {
        Self {
            id: UnitId(id),
            owner,
            kind,
            position,
            hitpoints,
            cargo: 0,
            pending: None,
        }
    }

    /// Whether the host is still executing an action for this unit.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether `player` owns this unit.
    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Owned by a player other than `player` (neutral units are never enemies).
    #[must_use]
    pub fn is_enemy_of(&self, player: PlayerId) -> bool {
        self.owner.is_some_and(|owner| owner != player)
    }

    /// Where this unit will stand once its current action resolves.
    ///
    /// Only an in-progress move changes the answer.
    #[must_use]
    pub fn predicted_position(&self) -> Position {
        match self.pending {
            Some(PendingAction {
                action: UnitAction::Move(direction),
                ..
            }) => self.position.step(direction),
            _ => self.position,
        }
    }

    /// Remaining ticks of an in-progress move, if the unit is moving.
    #[must_use]
    pub fn move_eta(&self) -> Option<u32> {
        match self.pending {
            Some(PendingAction {
                action: UnitAction::Move(_),
                eta,
                ..
            }) => Some(eta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;

    #[test]
    fn test_predicted_position_follows_pending_move() {
        let mut unit = Unit::new(1, Some(PlayerId(1)), UnitKind::Light, Position::new(3, 3), 4);
        assert_eq!(unit.predicted_position(), Position::new(3, 3));
        unit.pending = Some(PendingAction {
            action: UnitAction::Move(Direction::Left),
            started_at: 10,
            eta: 4,
        });
        assert_eq!(unit.predicted_position(), Position::new(2, 3));
        assert_eq!(unit.move_eta(), Some(4));
    }

    #[test]
    fn test_neutral_units_are_not_enemies() {
        let resource = Unit::new(9, None, UnitKind::Resource, Position::new(0, 0), 1);
        assert!(!resource.is_enemy_of(PlayerId(0)));
        assert!(!resource.is_owned_by(PlayerId(0)));
        assert_eq!(PlayerId(0).opponent(), PlayerId(1));
    }
}
