//! Test fixtures and helpers.
//!
//! Snapshot builders and canned scenarios for consistent testing.

use fixed::types::I32F32;
use skirmish_core::prelude::*;

/// The player tests act for.
pub const ME: PlayerId = PlayerId(0);
/// The opponent.
pub const THEM: PlayerId = PlayerId(1);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In engine code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Incremental snapshot builder.
///
/// Ids are handed out in insertion order starting at 1; hitpoints default
/// to the standard unit table.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    table: UnitTypeTable,
    next_id: u64,
}

impl SnapshotBuilder {
    /// Open map of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_terrain(Terrain::open(width, height))
    }

    /// Map from `.`/`#` rows.
    ///
    /// # Panics
    ///
    /// Panics on malformed rows.
    #[must_use]
    pub fn from_rows(rows: &[&str]) -> Self {
        Self::with_terrain(Terrain::from_rows(rows).expect("valid terrain rows"))
    }

    fn with_terrain(terrain: Terrain) -> Self {
        Self {
            snapshot: Snapshot::new(0, terrain),
            table: UnitTypeTable::default(),
            next_id: 1,
        }
    }

    /// Set the snapshot tick.
    #[must_use]
    pub fn tick(mut self, tick: u64) -> Self {
        self.snapshot.tick = tick;
        self
    }

    /// Set a player's banked resources.
    #[must_use]
    pub fn bank(mut self, player: PlayerId, amount: i32) -> Self {
        self.snapshot.resources.insert(player, amount);
        self
    }

    /// Add a unit and return its id.
    pub fn add(&mut self, owner: Option<PlayerId>, kind: UnitKind, x: i32, y: i32) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        let hitpoints = self.table.get(kind).hitpoints;
        self.snapshot
            .units
            .push(Unit::new(id, owner, kind, Position::new(x, y), hitpoints));
        UnitId(id)
    }

    /// Add a unit owned by `owner`.
    pub fn own(&mut self, owner: PlayerId, kind: UnitKind, x: i32, y: i32) -> UnitId {
        self.add(Some(owner), kind, x, y)
    }

    /// Add a resource field holding `amount`.
    pub fn resource(&mut self, x: i32, y: i32, amount: i32) -> UnitId {
        let id = self.add(None, UnitKind::Resource, x, y);
        self.edit(id, |u| u.cargo = amount);
        id
    }

    /// Modify an already added unit.
    ///
    /// # Panics
    ///
    /// Panics if the id was never added.
    pub fn edit(&mut self, id: UnitId, f: impl FnOnce(&mut Unit)) {
        let unit = self
            .snapshot
            .units
            .iter_mut()
            .find(|u| u.id == id)
            .expect("unit added by this builder");
        f(unit);
    }

    /// Give a unit an in-progress action.
    pub fn pending(&mut self, id: UnitId, action: UnitAction, eta: u32) {
        let started_at = self.snapshot.tick;
        self.edit(id, |u| {
            u.pending = Some(PendingAction {
                action,
                started_at,
                eta,
            });
        });
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

/// The usual 8x8 opening: base, worker and two resource fields per side.
#[must_use]
pub fn opening_8x8() -> Snapshot {
    let mut b = SnapshotBuilder::new(8, 8).bank(ME, 5).bank(THEM, 5);
    b.resource(0, 0, 20);
    b.resource(7, 7, 20);
    b.own(ME, UnitKind::Base, 2, 1);
    b.own(ME, UnitKind::Worker, 1, 1);
    b.own(THEM, UnitKind::Base, 5, 6);
    b.own(THEM, UnitKind::Worker, 6, 6);
    b.build()
}

/// A mid-game 16x16 map with armies on both sides, for benchmarks.
#[must_use]
pub fn battlefield_16x16(per_side: i32) -> Snapshot {
    let mut b = SnapshotBuilder::new(16, 16).bank(ME, 20).bank(THEM, 20);
    b.resource(0, 0, 50);
    b.resource(15, 15, 50);
    b.own(ME, UnitKind::Base, 2, 2);
    b.own(ME, UnitKind::Barracks, 4, 1);
    b.own(THEM, UnitKind::Base, 13, 13);
    b.own(THEM, UnitKind::Barracks, 11, 14);
    for i in 0..per_side.clamp(0, 16) {
        let kind = match i % 3 {
            0 => UnitKind::Light,
            1 => UnitKind::Heavy,
            _ => UnitKind::Ranged,
        };
        b.own(ME, kind, i % 8, 5 + i / 8);
        b.own(THEM, kind, 15 - i % 8, 10 - i / 8);
    }
    for x in 0..3 {
        b.own(ME, UnitKind::Worker, 1 + x, 4);
        b.own(THEM, UnitKind::Worker, 12 + x, 11);
    }
    b.build()
}
