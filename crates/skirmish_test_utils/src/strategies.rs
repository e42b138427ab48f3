//! Proptest strategies.
//!
//! Random but reproducible snapshots for property-based testing of the
//! engine. Generated snapshots always pass [`Snapshot::validate`]: units
//! are in bounds and never share a cell.

use std::collections::BTreeMap;

use proptest::prelude::*;
use skirmish_core::prelude::*;

use crate::fixtures::{ME, THEM};

/// Any unit kind a player can own.
pub fn arb_owned_kind() -> impl Strategy<Value = UnitKind> {
    prop_oneof![
        3 => Just(UnitKind::Worker),
        1 => Just(UnitKind::Base),
        1 => Just(UnitKind::Barracks),
        2 => Just(UnitKind::Light),
        2 => Just(UnitKind::Heavy),
        2 => Just(UnitKind::Ranged),
    ]
}

/// `Some(ME)`, `Some(THEM)` or a neutral resource.
fn arb_owner() -> impl Strategy<Value = Option<PlayerId>> {
    prop_oneof![
        4 => Just(Some(ME)),
        4 => Just(Some(THEM)),
        1 => Just(None),
    ]
}

/// A cell on a `width` x `height` map.
pub fn arb_position(width: u32, height: u32) -> impl Strategy<Value = Position> {
    (0..width as i32, 0..height as i32).prop_map(|(x, y)| Position::new(x, y))
}

/// An open map with up to `max_units` idle units and random banks.
pub fn arb_snapshot(width: u32, height: u32, max_units: usize) -> impl Strategy<Value = Snapshot> {
    let unit = (arb_position(width, height), arb_owner(), arb_owned_kind(), 0..2i32);
    (
        prop::collection::vec(unit, 0..=max_units),
        0..20i32,
        0..20i32,
        0..4000u64,
    )
        .prop_map(move |(units, mine, theirs, tick)| {
            let table = UnitTypeTable::default();
            let mut snapshot = Snapshot::new(tick, Terrain::open(width, height));
            snapshot.resources.insert(ME, mine);
            snapshot.resources.insert(THEM, theirs);

            let mut by_cell = BTreeMap::new();
            for (position, owner, kind, cargo) in units {
                by_cell.entry(position).or_insert((owner, kind, cargo));
            }
            for (id, (position, (owner, kind, cargo))) in by_cell.into_iter().enumerate() {
                let kind = if owner.is_none() { UnitKind::Resource } else { kind };
                let mut unit = Unit::new(
                    id as u64 + 1,
                    owner,
                    kind,
                    position,
                    table.get(kind).hitpoints,
                );
                unit.cargo = match kind {
                    UnitKind::Resource => 10,
                    UnitKind::Worker => cargo,
                    _ => 0,
                };
                snapshot.units.push(unit);
            }
            snapshot
        })
}
