//! Unit classification.
//!
//! One pass over the snapshot tags every unit with a `(Side, Role)` pair
//! and files it into per-side buckets. Buckets hold references into the
//! snapshot and are sorted by unit id, so classifying the same snapshot
//! twice yields identical rosters.

use skirmish_core::prelude::*;

/// Which player a unit belongs to, from our point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Ours.
    Own,
    /// The opponent's.
    Enemy,
    /// Nobody's (resource fields).
    Neutral,
}

/// What a unit can be used for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Worker with no action in progress.
    IdleWorker,
    /// Worker still executing an action.
    BusyWorker,
    /// Stockpile.
    Base,
    /// Combat unit factory.
    Barracks,
    /// Light, heavy or ranged unit with no action in progress.
    IdleCombat,
    /// Light, heavy or ranged unit still executing an action.
    BusyCombat,
    /// Harvestable field.
    Resource,
}

/// Tag a single unit.
#[must_use]
pub fn classify_unit(unit: &Unit, me: PlayerId) -> (Side, Role) {
    let side = match unit.owner {
        None => Side::Neutral,
        Some(owner) if owner == me => Side::Own,
        Some(_) => Side::Enemy,
    };
    let role = match unit.kind {
        UnitKind::Worker if unit.is_busy() => Role::BusyWorker,
        UnitKind::Worker => Role::IdleWorker,
        UnitKind::Base => Role::Base,
        UnitKind::Barracks => Role::Barracks,
        UnitKind::Light | UnitKind::Heavy | UnitKind::Ranged if unit.is_busy() => Role::BusyCombat,
        UnitKind::Light | UnitKind::Heavy | UnitKind::Ranged => Role::IdleCombat,
        UnitKind::Resource => Role::Resource,
    };
    (side, role)
}

/// Role buckets for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideRoster<'a> {
    /// Idle workers.
    pub workers_idle: Vec<&'a Unit>,
    /// Workers with an action in progress.
    pub workers_busy: Vec<&'a Unit>,
    /// Bases.
    pub bases: Vec<&'a Unit>,
    /// Barracks.
    pub barracks: Vec<&'a Unit>,
    /// Idle combat units.
    pub combat_idle: Vec<&'a Unit>,
    /// Combat units with an action in progress.
    pub combat_busy: Vec<&'a Unit>,
}

impl<'a> SideRoster<'a> {
    fn bucket_mut(&mut self, role: Role) -> Option<&mut Vec<&'a Unit>> {
        match role {
            Role::IdleWorker => Some(&mut self.workers_idle),
            Role::BusyWorker => Some(&mut self.workers_busy),
            Role::Base => Some(&mut self.bases),
            Role::Barracks => Some(&mut self.barracks),
            Role::IdleCombat => Some(&mut self.combat_idle),
            Role::BusyCombat => Some(&mut self.combat_busy),
            Role::Resource => None,
        }
    }

    fn sort(&mut self) {
        for bucket in [
            &mut self.workers_idle,
            &mut self.workers_busy,
            &mut self.bases,
            &mut self.barracks,
            &mut self.combat_idle,
            &mut self.combat_busy,
        ] {
            bucket.sort_by_key(|u| u.id);
        }
    }

    /// Every combat unit, idle first.
    pub fn combat(&self) -> impl Iterator<Item = &'a Unit> + '_ {
        self.combat_idle.iter().chain(&self.combat_busy).copied()
    }

    /// Every worker, idle first.
    pub fn workers(&self) -> impl Iterator<Item = &'a Unit> + '_ {
        self.workers_idle.iter().chain(&self.workers_busy).copied()
    }

    /// Combat units of one kind, idle and busy.
    #[must_use]
    pub fn combat_count(&self, kind: UnitKind) -> usize {
        self.combat().filter(|u| u.kind == kind).count()
    }
}

/// Every unit of a snapshot, bucketed by side and role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster<'a> {
    /// Our units.
    pub own: SideRoster<'a>,
    /// The opponent's units.
    pub enemy: SideRoster<'a>,
    /// Every resource field.
    pub resources: Vec<&'a Unit>,
    /// Resource fields whose nearest base is ours.
    pub owned_resources: Vec<&'a Unit>,
    /// Every enemy-owned unit, structures included.
    pub alive_enemies: Vec<&'a Unit>,
}

impl<'a> Roster<'a> {
    /// Classify a snapshot from `me`'s point of view.
    #[must_use]
    pub fn classify(snapshot: &'a Snapshot, me: PlayerId) -> Self {
        let mut roster = Self::default();
        for unit in &snapshot.units {
            let (side, role) = classify_unit(unit, me);
            match side {
                Side::Own => {
                    if let Some(bucket) = roster.own.bucket_mut(role) {
                        bucket.push(unit);
                    }
                }
                Side::Enemy => {
                    roster.alive_enemies.push(unit);
                    if let Some(bucket) = roster.enemy.bucket_mut(role) {
                        bucket.push(unit);
                    }
                }
                Side::Neutral => {
                    if role == Role::Resource {
                        roster.resources.push(unit);
                    }
                }
            }
        }

        roster.own.sort();
        roster.enemy.sort();
        roster.resources.sort_by_key(|u| u.id);
        roster.alive_enemies.sort_by_key(|u| u.id);

        let all_bases: Vec<&Unit> = roster
            .own
            .bases
            .iter()
            .chain(&roster.enemy.bases)
            .copied()
            .collect();
        roster.owned_resources = roster
            .resources
            .iter()
            .copied()
            .filter(|resource| {
                nearest(resource.position, all_bases.iter().copied())
                    .is_some_and(|base| base.is_owned_by(me))
            })
            .collect();

        roster
    }
}

/// The unit closest to `from` by Manhattan distance, ties broken by id.
pub fn nearest<'a, I>(from: Position, units: I) -> Option<&'a Unit>
where
    I: IntoIterator<Item = &'a Unit>,
{
    units
        .into_iter()
        .min_by_key(|u| (from.manhattan(u.position), u.id))
}

/// Like [`nearest`], measured to each unit's predicted cell.
pub fn nearest_predicted<'a, I>(from: Position, units: I) -> Option<&'a Unit>
where
    I: IntoIterator<Item = &'a Unit>,
{
    units
        .into_iter()
        .min_by_key(|u| (from.manhattan(u.predicted_position()), u.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        let mut s = Snapshot::new(0, Terrain::open(8, 8));
        let me = Some(PlayerId(0));
        let them = Some(PlayerId(1));
        s.units.push(Unit::new(9, me, UnitKind::Worker, Position::new(1, 1), 1));
        s.units.push(Unit::new(3, me, UnitKind::Base, Position::new(0, 0), 10));
        s.units.push(Unit::new(4, them, UnitKind::Base, Position::new(7, 7), 10));
        s.units.push(Unit::new(5, None, UnitKind::Resource, Position::new(0, 2), 10));
        s.units.push(Unit::new(6, None, UnitKind::Resource, Position::new(7, 5), 10));
        s.units.push(Unit::new(7, them, UnitKind::Heavy, Position::new(5, 5), 8));
        let mut busy = Unit::new(2, me, UnitKind::Light, Position::new(2, 2), 4);
        busy.pending = Some(PendingAction {
            action: UnitAction::Move(Direction::Right),
            started_at: 0,
            eta: 3,
        });
        s.units.push(busy);
        s.units.push(Unit::new(1, me, UnitKind::Ranged, Position::new(3, 3), 1));
        s
    }

    #[test]
    fn test_buckets() {
        let s = snapshot();
        let roster = Roster::classify(&s, PlayerId(0));
        assert_eq!(roster.own.workers_idle.len(), 1);
        assert_eq!(roster.own.bases[0].id, UnitId(3));
        assert_eq!(roster.own.combat_idle[0].id, UnitId(1));
        assert_eq!(roster.own.combat_busy[0].id, UnitId(2));
        assert_eq!(roster.enemy.combat_idle[0].id, UnitId(7));
        assert_eq!(roster.alive_enemies.len(), 2);
        assert_eq!(roster.resources.len(), 2);
        assert_eq!(roster.owned_resources.len(), 1);
        assert_eq!(roster.owned_resources[0].id, UnitId(5));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let s = snapshot();
        let first = Roster::classify(&s, PlayerId(0));
        let second = Roster::classify(&s, PlayerId(0));
        assert_eq!(first, second);
    }

    #[test]
    fn test_tags() {
        let s = snapshot();
        let resource = s.unit(UnitId(5)).unwrap();
        assert_eq!(
            classify_unit(resource, PlayerId(0)),
            (Side::Neutral, Role::Resource)
        );
        let light = s.unit(UnitId(2)).unwrap();
        assert_eq!(classify_unit(light, PlayerId(0)), (Side::Own, Role::BusyCombat));
        assert_eq!(classify_unit(light, PlayerId(1)), (Side::Enemy, Role::BusyCombat));
    }

    #[test]
    fn test_nearest_breaks_ties_by_id() {
        let s = snapshot();
        let roster = Roster::classify(&s, PlayerId(0));
        let from = Position::new(2, 3);
        // Unit 1 at (3, 3) and unit 2 at (2, 2) are both one step away
        let closest = nearest(from, roster.own.combat()).unwrap();
        assert_eq!(closest.id, UnitId(1));
        // Unit 2 is heading to (3, 2): two steps away once it arrives
        let closest = nearest_predicted(Position::new(2, 1), roster.own.combat()).unwrap();
        assert_eq!(closest.id, UnitId(2));
    }
}
