//! Per-type unit statistics.
//!
//! The defaults match the standard grid-RTS unit table. A host running a
//! different balance can ship its own table as RON:
//!
//! ```ron
//! (
//!     stats: {
//!         Light: (
//!             cost: 2, hitpoints: 4, min_damage: 2, max_damage: 2,
//!             attack_range: 1, move_time: 8, attack_time: 5, produce_time: 80,
//!         ),
//!     },
//! )
//! ```
//!
//! Kinds missing from a file keep their default stats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::unit::UnitKind;

/// Static statistics for one unit type. Times are in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Resource cost to produce.
    pub cost: i32,
    /// Maximum hitpoints.
    pub hitpoints: i32,
    /// Minimum damage per attack.
    #[serde(default)]
    pub min_damage: i32,
    /// Maximum damage per attack.
    #[serde(default)]
    pub max_damage: i32,
    /// Euclidean attack range in cells (0 = cannot attack).
    #[serde(default)]
    pub attack_range: i32,
    /// Ticks per one-cell move (0 = immobile).
    #[serde(default)]
    pub move_time: i32,
    /// Ticks per attack.
    #[serde(default)]
    pub attack_time: i32,
    /// Ticks to produce this unit.
    #[serde(default)]
    pub produce_time: i32,
    /// Ticks per harvest action (0 = cannot harvest).
    #[serde(default)]
    pub harvest_time: i32,
    /// Ticks per return action.
    #[serde(default)]
    pub return_time: i32,
    /// Resources gathered per harvest.
    #[serde(default)]
    pub harvest_amount: i32,
    /// Unit kinds this unit can produce.
    #[serde(default)]
    pub produces: Vec<UnitKind>,
}

impl UnitStats {
    /// Whether this type can attack.
    #[must_use]
    pub const fn can_attack(&self) -> bool {
        self.attack_range > 0 && self.max_damage > 0
    }

    /// Whether this type can move.
    #[must_use]
    pub const fn can_move(&self) -> bool {
        self.move_time > 0
    }

    /// Whether this type can harvest.
    #[must_use]
    pub const fn can_harvest(&self) -> bool {
        self.harvest_time > 0
    }

    /// Whether this type can produce `kind`.
    #[must_use]
    pub fn can_produce(&self, kind: UnitKind) -> bool {
        self.produces.contains(&kind)
    }

    /// Expected damage of one attack, `(min + max) / 2`.
    #[must_use]
    pub const fn average_damage(&self) -> i32 {
        (self.min_damage + self.max_damage) / 2
    }
}

/// On-disk shape of a table override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UnitTableFile {
    #[serde(default)]
    stats: BTreeMap<UnitKind, UnitStats>,
}

/// Lookup from unit kind to its statistics.
///
/// Complete by construction: one entry per [`UnitKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTypeTable {
    stats: [UnitStats; 7],
}

impl Default for UnitTypeTable {
    fn default() -> Self {
        Self {
            stats: UnitKind::ALL.map(default_stats),
        }
    }
}

impl UnitTypeTable {
    /// Stats for a kind.
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> &UnitStats {
        &self.stats[kind_index(kind)]
    }

    /// Replace the stats of one kind.
    pub fn set(&mut self, kind: UnitKind, stats: UnitStats) {
        self.stats[kind_index(kind)] = stats;
    }

    /// Load overrides from a RON string on top of the defaults.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let file: UnitTableFile = ron::from_str(source).map_err(|e| CoreError::DataParseError {
            source_name: "unit table".into(),
            message: e.to_string(),
        })?;
        let mut table = Self::default();
        for (kind, stats) in file.stats {
            if stats.min_damage > stats.max_damage {
                return Err(CoreError::DataParseError {
                    source_name: "unit table".into(),
                    message: format!("{kind:?}: min_damage exceeds max_damage"),
                });
            }
            table.set(kind, stats);
        }
        Ok(table)
    }
}

const fn kind_index(kind: UnitKind) -> usize {
    match kind {
        UnitKind::Worker => 0,
        UnitKind::Base => 1,
        UnitKind::Barracks => 2,
        UnitKind::Ranged => 3,
        UnitKind::Heavy => 4,
        UnitKind::Light => 5,
        UnitKind::Resource => 6,
    }
}

/// Standard grid-RTS balance.
fn default_stats(kind: UnitKind) -> UnitStats {
    let blank = UnitStats {
        cost: 0,
        hitpoints: 1,
        min_damage: 0,
        max_damage: 0,
        attack_range: 0,
        move_time: 0,
        attack_time: 0,
        produce_time: 0,
        harvest_time: 0,
        return_time: 0,
        harvest_amount: 0,
        produces: Vec::new(),
    };
    match kind {
        UnitKind::Resource => blank,
        UnitKind::Base => UnitStats {
            cost: 10,
            hitpoints: 10,
            produce_time: 250,
            produces: vec![UnitKind::Worker],
            ..blank
        },
        UnitKind::Barracks => UnitStats {
            cost: 5,
            hitpoints: 4,
            produce_time: 200,
            produces: vec![UnitKind::Light, UnitKind::Heavy, UnitKind::Ranged],
            ..blank
        },
        UnitKind::Worker => UnitStats {
            cost: 1,
            hitpoints: 1,
            min_damage: 1,
            max_damage: 1,
            attack_range: 1,
            move_time: 10,
            attack_time: 5,
            produce_time: 50,
            harvest_time: 20,
            return_time: 10,
            harvest_amount: 1,
            produces: vec![UnitKind::Base, UnitKind::Barracks],
        },
        UnitKind::Light => UnitStats {
            cost: 2,
            hitpoints: 4,
            min_damage: 2,
            max_damage: 2,
            attack_range: 1,
            move_time: 8,
            attack_time: 5,
            produce_time: 80,
            ..blank
        },
        UnitKind::Heavy => UnitStats {
            cost: 3,
            hitpoints: 8,
            min_damage: 4,
            max_damage: 4,
            attack_range: 1,
            move_time: 10,
            attack_time: 5,
            produce_time: 120,
            ..blank
        },
        UnitKind::Ranged => UnitStats {
            cost: 2,
            hitpoints: 1,
            min_damage: 1,
            max_damage: 1,
            attack_range: 3,
            move_time: 10,
            attack_time: 5,
            produce_time: 100,
            ..blank
        },
    }
}
