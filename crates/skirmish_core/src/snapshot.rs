//! Immutable per-tick world snapshot.
//!
//! A snapshot is everything the engine may observe in one tick: the
//! terrain, every visible unit (with any action the host is still
//! executing) and each player's banked resources. The host is
//! authoritative; the engine never mutates a snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::grid::{Position, Terrain};
use crate::unit::{PlayerId, Unit, UnitId, UnitKind};

/// Observable state of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation tick.
    pub tick: u64,
    /// Static map.
    pub terrain: Terrain,
    /// Every visible unit, resources included.
    pub units: Vec<Unit>,
    /// Banked resources per player.
    #[serde(default, with = "bank_entries")]
    pub resources: BTreeMap<PlayerId, i32>,
}

impl Snapshot {
    /// Create a snapshot with no units and nothing banked.
    #[must_use]
    pub fn new(tick: u64, terrain: Terrain) -> Self {
        Self {
            tick,
            terrain,
            units: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.terrain.width()
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.terrain.height()
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// The unit standing on a cell, if any.
    #[must_use]
    pub fn unit_at(&self, pos: Position) -> Option<&Unit> {
        self.units.iter().find(|u| u.position == pos)
    }

    /// Walkable and unoccupied.
    #[must_use]
    pub fn is_free(&self, pos: Position) -> bool {
        self.terrain.is_walkable(pos) && self.unit_at(pos).is_none()
    }

    /// Resources banked by a player.
    #[must_use]
    pub fn banked(&self, player: PlayerId) -> i32 {
        self.resources.get(&player).copied().unwrap_or(0)
    }

    /// Units owned by a player, in snapshot order.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(move |u| u.is_owned_by(player))
    }

    /// Whether any resource field remains on the map.
    #[must_use]
    pub fn has_resource_fields(&self) -> bool {
        self.units.iter().any(|u| u.kind == UnitKind::Resource)
    }

    /// Check the snapshot is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns an error if the terrain is malformed, two units share an id
    /// or a cell, or a unit stands outside the map.
    pub fn validate(&self) -> Result<()> {
        let result = self.check_consistency();
        if let Err(e) = &result {
            debug!(tick = self.tick, units = self.units.len(), error = %e, "snapshot rejected");
        }
        result
    }

    fn check_consistency(&self) -> Result<()> {
        self.terrain.validate()?;

        let mut ids = BTreeSet::new();
        let mut cells: BTreeMap<Position, UnitId> = BTreeMap::new();
        for unit in &self.units {
            if !ids.insert(unit.id) {
                return Err(CoreError::DuplicateUnitId(unit.id));
            }
            if !self.terrain.in_bounds(unit.position) {
                return Err(CoreError::UnitOutOfBounds {
                    unit: unit.id,
                    position: unit.position,
                    width: self.width(),
                    height: self.height(),
                });
            }
            if let Some(&first) = cells.get(&unit.position) {
                return Err(CoreError::CellConflict {
                    first,
                    second: unit.id,
                    position: unit.position,
                });
            }
            cells.insert(unit.position, unit.id);
        }
        Ok(())
    }

    /// Parse a snapshot from RON and validate it.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let snapshot: Self = ron::from_str(source).map_err(|e| CoreError::DataParseError {
            source_name: "snapshot".into(),
            message: e.to_string(),
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Banks travel as `[{ player, amount }]` rather than a map.
///
/// Integer map keys arrive as strings in JSON, which the buffered
/// deserializer behind tagged protocol enums cannot turn back into ids.
mod bank_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::unit::PlayerId;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        player: PlayerId,
        amount: i32,
    }

    pub fn serialize<S>(banks: &BTreeMap<PlayerId, i32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<Entry> = banks
            .iter()
            .map(|(&player, &amount)| Entry { player, amount })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<PlayerId, i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| (e.player, e.amount)).collect())
    }
}
