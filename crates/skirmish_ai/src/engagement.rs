//! Engagement arbiter.
//!
//! Each combat unit goes through a fixed priority list:
//!
//! 1. **Attack** an enemy in range that will still be there when the blow lands
//! 2. **Evade** (ranged only) a threat in range that we cannot hit, or hold
//!    while the enemies in range move away
//! 3. **Chase** the nearest enemy, or **Regroup** on our allies
//! 4. **Idle** when nothing applies
//!
//! [`decide`] is a pure function of the unit and a read-only view of the
//! tick; [`arbitrate`] turns decisions into legal actions through the tick
//! context, in a fixed order so earlier units have right of way.

use skirmish_core::prelude::*;
use tracing::trace;

use crate::aggression::AggressionGate;
use crate::classify::nearest_predicted;
use crate::config::{EngineConfig, MapProfile};
use crate::context::TickContext;
use crate::ledger::DamageLedger;

/// Flight candidates in evaluation order.
const FLIGHT_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Right,
    Direction::Left,
];

/// Arbiter state a decision belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementState {
    /// Strike an enemy in range.
    Attack,
    /// Step away from a threat.
    Evade,
    /// Close in on an enemy.
    Chase,
    /// Move to the allied centroid.
    Regroup,
    /// Stay put.
    Idle,
}

/// Why a unit chases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChaseReason {
    /// The offense gate is open.
    Committed,
    /// The enemy came within chase distance.
    EnemyNear,
    /// Past the middle of the expected match length.
    LateGame,
    /// Allies are close enough to advance together.
    Formation,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Attack the unit standing on `cell`.
    Attack {
        /// Target unit.
        target: UnitId,
        /// Its cell.
        cell: Position,
    },
    /// Flee from a threat's predicted cell.
    Evade {
        /// The threat.
        threat: UnitId,
        /// Where it will stand.
        from: Position,
    },
    /// Head into range of an enemy's predicted cell.
    Chase {
        /// The enemy.
        target: UnitId,
        /// Where it will stand.
        cell: Position,
        /// What triggered the chase.
        reason: ChaseReason,
    },
    /// Walk to the centroid of our combat units.
    Regroup {
        /// Integer centroid.
        centroid: Position,
    },
    /// No allies to join: hold a station on the defense ring.
    Guard,
    /// Nothing to do.
    Idle,
}

impl Decision {
    /// The state this decision belongs to.
    #[must_use]
    pub const fn state(&self) -> EngagementState {
        match self {
            Self::Attack { .. } => EngagementState::Attack,
            Self::Evade { .. } => EngagementState::Evade,
            Self::Chase { .. } => EngagementState::Chase,
            Self::Regroup { .. } => EngagementState::Regroup,
            Self::Guard | Self::Idle => EngagementState::Idle,
        }
    }
}

/// Read-only view of the tick used by [`decide`].
#[derive(Clone, Copy)]
pub struct EngagementView<'v> {
    /// Unit statistics.
    pub table: &'v UnitTypeTable,
    /// Damage queued so far this tick.
    pub ledger: &'v DamageLedger,
    /// Enemies that may be engaged.
    pub enemies: &'v [&'v Unit],
    /// Our combat units and fighting workers.
    pub allies: &'v [&'v Unit],
    /// Tuning knobs.
    pub config: &'v EngineConfig,
    /// Map-size parameters.
    pub profile: MapProfile,
    /// Snapshot tick.
    pub tick: u64,
}

impl EngagementView<'_> {
    fn is_targetable(&self, enemy: &Unit) -> bool {
        !(self.config.exclude_effectively_dead && self.ledger.is_dead(enemy.id))
    }
}

/// Whether `enemy` finishes its move out of our range before our attack lands.
fn leaves_range(unit: &Unit, stats: &UnitStats, enemy: &Unit) -> bool {
    enemy.move_eta().is_some_and(|eta| {
        eta <= stats.attack_time.max(0) as u32
            && !unit
                .position
                .within_range(enemy.predicted_position(), stats.attack_range)
    })
}

/// Pick an attack target: finishing blows first, then the closest.
///
/// Targets already predicted dead rank last when they are not excluded.
#[must_use]
pub fn best_target<'u>(
    unit: &Unit,
    stats: &UnitStats,
    view: &EngagementView<'u>,
) -> Option<&'u Unit> {
    let in_range = view.enemies.iter().copied().filter(|e| {
        view.is_targetable(e)
            && unit.position.within_range(e.position, stats.attack_range)
            && !leaves_range(unit, stats, e)
    });
    in_range.min_by_key(|e| {
        let dead = view.ledger.is_dead(e.id);
        let killable = view.ledger.remaining(e) - stats.min_damage <= 0;
        (dead, !killable, unit.position.manhattan(e.position), e.id)
    })
}

/// Whether a ranged unit should step away from `threat`.
fn should_flee(unit_stats: &UnitStats, threat: &Unit, threat_stats: &UnitStats, unit: &Unit) -> bool {
    let out_of_reach = !threat
        .predicted_position()
        .within_range(unit.position, threat_stats.attack_range);
    let eta = threat.move_eta().map_or(0, |eta| eta as i32);
    out_of_reach || eta + threat_stats.attack_time >= unit_stats.move_time
}

/// Integer centroid of a set of units.
#[must_use]
pub fn centroid(units: &[&Unit]) -> Option<Position> {
    let count = i32::try_from(units.len()).ok().filter(|n| *n > 0)?;
    let (x, y) = units
        .iter()
        .fold((0, 0), |(x, y), u| (x + u.position.x, y + u.position.y));
    Some(Position::new(x / count, y / count))
}

/// Decide what one unit should do. Pure.
#[must_use]
pub fn decide(unit: &Unit, stats: &UnitStats, view: &EngagementView<'_>, gate: &AggressionGate) -> Decision {
    if stats.can_attack() {
        if let Some(target) = best_target(unit, stats, view) {
            return Decision::Attack {
                target: target.id,
                cell: target.position,
            };
        }

        // Everything in range is on its way out: hold rather than chase it.
        let in_range: Vec<&Unit> = view
            .enemies
            .iter()
            .copied()
            .filter(|e| {
                view.is_targetable(e) && unit.position.within_range(e.position, stats.attack_range)
            })
            .collect();
        if !in_range.is_empty() {
            if stats.attack_range > 1 && stats.can_move() {
                let threats = in_range
                    .iter()
                    .copied()
                    .filter(|e| view.table.get(e.kind).can_attack());
                if let Some(threat) = nearest_predicted(unit.position, threats) {
                    if should_flee(stats, threat, view.table.get(threat.kind), unit) {
                        return Decision::Evade {
                            threat: threat.id,
                            from: threat.predicted_position(),
                        };
                    }
                }
            }
            return Decision::Idle;
        }
    }

    if !stats.can_move() {
        return Decision::Idle;
    }
    let candidates = view.enemies.iter().copied().filter(|e| view.is_targetable(e));
    let Some(enemy) = nearest_predicted(unit.position, candidates) else {
        return Decision::Idle;
    };
    let cell = enemy.predicted_position();
    let chase = |reason| Decision::Chase {
        target: enemy.id,
        cell,
        reason,
    };

    let late = view.profile.is_late(view.tick);
    if gate.commit {
        return chase(ChaseReason::Committed);
    }
    if unit.position.manhattan(cell) <= view.config.chase_distance {
        return chase(ChaseReason::EnemyNear);
    }
    if late {
        return chase(ChaseReason::LateGame);
    }

    let allies: Vec<&Unit> = view
        .allies
        .iter()
        .copied()
        .filter(|a| a.id != unit.id)
        .collect();
    match centroid(&allies) {
        None if view.config.guard_stations => Decision::Guard,
        None => Decision::Idle,
        Some(center) if unit.position.manhattan(center) <= view.config.formation_distance => {
            chase(ChaseReason::Formation)
        }
        Some(center) => Decision::Regroup { centroid: center },
    }
}

/// Escape step strictly increasing the distance from `from`.
///
/// Axis-aligned escape is preferred when the threat shares a row or column.
#[must_use]
pub fn flight_step(ctx: &TickContext<'_>, unit: &Unit, from: Position) -> Option<Direction> {
    let current = unit.position.manhattan(from);
    let valid: Vec<Direction> = FLIGHT_ORDER
        .into_iter()
        .filter(|d| {
            let next = unit.position.step(*d);
            next.manhattan(from) > current && ctx.reservations.is_free(ctx.snapshot, next)
        })
        .collect();
    let preferred: &[Direction] = if from.x == unit.position.x {
        &[Direction::Up, Direction::Down]
    } else if from.y == unit.position.y {
        &[Direction::Right, Direction::Left]
    } else {
        &[]
    };
    valid
        .iter()
        .copied()
        .find(|d| preferred.contains(d))
        .or_else(|| valid.first().copied())
}

/// Step towards `goal`; nudge out of a deadlock; otherwise hold.
fn advance(ctx: &mut TickContext<'_>, unit: &Unit, goal: PathGoal) {
    if ctx.move_toward(unit, goal) || ctx.nudge(unit) {
        return;
    }
    ctx.hold(unit);
}

/// Turn a decision into an action and record it.
pub fn realise(ctx: &mut TickContext<'_>, unit: &Unit, decision: Decision) {
    let stats = ctx.stats(unit);
    trace!(unit = %unit.id, ?decision, "engagement decision");
    match decision {
        Decision::Attack { target, cell } => {
            ctx.report.attacks += 1;
            if !ctx.issue(unit, UnitAction::Attack(cell)) {
                ctx.hold(unit);
                return;
            }
            let snapshot = ctx.snapshot;
            if let Some(enemy) = snapshot.unit(target) {
                if ctx.ledger.register(stats, enemy) {
                    ctx.report.effectively_dead += 1;
                }
            }
        }
        Decision::Evade { from, .. } => {
            ctx.report.evades += 1;
            let fled = flight_step(ctx, unit, from)
                .is_some_and(|direction| ctx.issue(unit, UnitAction::Move(direction)));
            if !fled {
                ctx.hold(unit);
            }
        }
        Decision::Chase { cell, .. } => {
            ctx.report.chases += 1;
            if unit.position.within_range(cell, stats.attack_range) {
                ctx.hold(unit);
            } else {
                advance(ctx, unit, PathGoal::WithinRange(cell, stats.attack_range));
            }
        }
        Decision::Regroup { centroid } => {
            ctx.report.regroups += 1;
            advance(ctx, unit, PathGoal::Cell(centroid));
        }
        Decision::Guard => {
            ctx.report.idles += 1;
            let station =
                ctx.rings
                    .station_for(ctx.snapshot, &ctx.roster, unit, stats.attack_range);
            let moved = station.is_some_and(|cell| ctx.move_toward(unit, PathGoal::Cell(cell)));
            if !moved {
                ctx.hold(unit);
            }
        }
        Decision::Idle => {
            ctx.report.idles += 1;
            ctx.hold(unit);
        }
    }
}

/// Evaluation order: fighting workers, then Light, Heavy, Ranged, each by id.
fn evaluation_order<'a>(ctx: &TickContext<'a>, workers: &[&'a Unit]) -> Vec<&'a Unit> {
    let mut order: Vec<&Unit> = workers.to_vec();
    order.sort_by_key(|u| u.id);
    for kind in [UnitKind::Light, UnitKind::Heavy, UnitKind::Ranged] {
        order.extend(
            ctx.roster
                .own
                .combat_idle
                .iter()
                .copied()
                .filter(|u| u.kind == kind),
        );
    }
    order
}

/// Decide and act for every idle combat unit and every fighting worker.
pub fn arbitrate<'a>(ctx: &mut TickContext<'a>, workers: &[&'a Unit]) {
    let order = evaluation_order(ctx, workers);
    let enemies = ctx.roster.alive_enemies.clone();
    let allies: Vec<&Unit> = ctx.roster.own.combat().chain(workers.iter().copied()).collect();

    for unit in order {
        if ctx.has_action(unit.id) {
            continue;
        }
        if ctx.budget_exhausted() {
            ctx.fallback(unit);
            continue;
        }
        let stats = ctx.stats(unit);
        let view = EngagementView {
            table: ctx.table,
            ledger: &ctx.ledger,
            enemies: &enemies,
            allies: &allies,
            config: ctx.config,
            profile: ctx.profile,
            tick: ctx.snapshot.tick,
        };
        let decision = decide(unit, stats, &view, &ctx.gate);
        realise(ctx, unit, decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'v>(
        table: &'v UnitTypeTable,
        ledger: &'v DamageLedger,
        config: &'v EngineConfig,
        enemies: &'v [&'v Unit],
        allies: &'v [&'v Unit],
    ) -> EngagementView<'v> {
        EngagementView {
            table,
            ledger,
            enemies,
            allies,
            config,
            profile: MapProfile::for_width(16),
            tick: 0,
        }
    }

    fn enemy(id: u64, kind: UnitKind, x: i32, y: i32, hp: i32) -> Unit {
        Unit::new(id, Some(PlayerId(1)), kind, Position::new(x, y), hp)
    }

    fn mine(id: u64, kind: UnitKind, x: i32, y: i32) -> Unit {
        Unit::new(id, Some(PlayerId(0)), kind, Position::new(x, y), 4)
    }

    #[test]
    fn test_prefers_finishing_blow() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Ranged, 5, 5);
        let healthy = enemy(2, UnitKind::Heavy, 5, 6, 8);
        let weak = enemy(3, UnitKind::Worker, 5, 8, 1);
        let enemies = [&healthy, &weak];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        let decision = decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed());
        assert_eq!(
            decision,
            Decision::Attack {
                target: UnitId(3),
                cell: Position::new(5, 8)
            }
        );
    }

    #[test]
    fn test_skips_effectively_dead_targets() {
        let table = UnitTypeTable::default();
        let mut ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 5, 5);
        let target = enemy(2, UnitKind::Light, 5, 6, 4);
        ledger.register(table.get(UnitKind::Heavy), &target);
        let enemies = [&target];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        let decision = decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed());
        assert_eq!(decision.state(), EngagementState::Idle);
    }

    #[test]
    fn test_dead_targets_rank_last_when_not_excluded() {
        let table = UnitTypeTable::default();
        let mut ledger = DamageLedger::new();
        let config = EngineConfig {
            exclude_effectively_dead: false,
            ..EngineConfig::default()
        };
        let unit = mine(1, UnitKind::Light, 5, 5);
        let doomed = enemy(2, UnitKind::Light, 5, 6, 4);
        let live = enemy(3, UnitKind::Light, 4, 5, 4);
        ledger.register(table.get(UnitKind::Heavy), &doomed);

        let both = [&doomed, &live];
        let v = view(&table, &ledger, &config, &both, &[]);
        let decision = decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed());
        assert_eq!(
            decision,
            Decision::Attack {
                target: UnitId(3),
                cell: Position::new(4, 5)
            }
        );

        let only = [&doomed];
        let v = view(&table, &ledger, &config, &only, &[]);
        let decision = decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed());
        assert_eq!(decision.state(), EngagementState::Attack);
    }

    #[test]
    fn test_lone_unit_idles_far_from_enemy() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let far = enemy(2, UnitKind::Light, 10, 10, 4);
        let enemies = [&far];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        let gate = AggressionGate::closed();
        assert_eq!(decide(&unit, table.get(unit.kind), &v, &gate), Decision::Idle);

        let committed = AggressionGate { commit: true, ..gate };
        assert!(matches!(
            decide(&unit, table.get(unit.kind), &v, &committed),
            Decision::Chase {
                reason: ChaseReason::Committed,
                ..
            }
        ));
    }

    fn moving(mut unit: Unit, direction: Direction, eta: u32) -> Unit {
        unit.pending = Some(PendingAction {
            action: UnitAction::Move(direction),
            started_at: 0,
            eta,
        });
        unit
    }

    #[test]
    fn test_melee_holds_while_target_steps_out_of_range() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 3, 3);
        let leaving = moving(enemy(2, UnitKind::Light, 3, 4, 4), Direction::Down, 2);
        let enemies = [&leaving];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        let committed = AggressionGate {
            commit: true,
            ..AggressionGate::closed()
        };
        assert_eq!(decide(&unit, table.get(unit.kind), &v, &committed), Decision::Idle);
    }

    #[test]
    fn test_ranged_holds_when_threat_strikes_first() {
        let mut table = UnitTypeTable::default();
        let mut long_heavy = table.get(UnitKind::Heavy).clone();
        long_heavy.attack_range = 5;
        table.set(UnitKind::Heavy, long_heavy);
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Ranged, 5, 5);
        // Leaves our range of 3 but stays inside its own, and strikes before we can step away.
        let threat = moving(enemy(2, UnitKind::Heavy, 5, 8, 8), Direction::Down, 1);
        let enemies = [&threat];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Idle
        );
    }

    #[test]
    fn test_ranged_evades_threat_out_of_its_reach() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Ranged, 3, 3);
        let threat = moving(enemy(2, UnitKind::Light, 3, 6, 4), Direction::Down, 2);
        let enemies = [&threat];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Evade {
                threat: UnitId(2),
                from: Position::new(3, 7)
            }
        );
    }

    #[test]
    fn test_chases_enemy_within_chase_distance() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let near = enemy(2, UnitKind::Light, 3, 2, 4);
        let enemies = [&near];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Chase {
                target: UnitId(2),
                cell: Position::new(3, 2),
                reason: ChaseReason::EnemyNear
            }
        );

        let beyond = enemy(2, UnitKind::Light, 3, 3, 4);
        let enemies = [&beyond];
        let v = view(&table, &ledger, &config, &enemies, &[]);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Idle
        );
    }

    #[test]
    fn test_late_game_chase_without_allies() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let far = enemy(2, UnitKind::Light, 10, 10, 4);
        let enemies = [&far];
        let mut v = view(&table, &ledger, &config, &enemies, &[]);

        v.tick = 2000;
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Idle
        );

        v.tick = 2001;
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Chase {
                target: UnitId(2),
                cell: Position::new(10, 10),
                reason: ChaseReason::LateGame
            }
        );
    }

    #[test]
    fn test_late_game_chase_beats_regroup() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let a = mine(2, UnitKind::Light, 8, 0);
        let far = enemy(3, UnitKind::Light, 15, 15, 4);
        let enemies = [&far];
        let allies = [&unit, &a];
        let mut v = view(&table, &ledger, &config, &enemies, &allies);
        v.tick = 3000;
        assert!(matches!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Chase {
                reason: ChaseReason::LateGame,
                ..
            }
        ));
    }

    #[test]
    fn test_advances_in_formation_near_allies() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let a = mine(2, UnitKind::Light, 2, 0);
        let b = mine(3, UnitKind::Light, 2, 2);
        let far = enemy(4, UnitKind::Light, 15, 15, 4);
        let enemies = [&far];
        let allies = [&unit, &a, &b];
        let v = view(&table, &ledger, &config, &enemies, &allies);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Chase {
                target: UnitId(4),
                cell: Position::new(15, 15),
                reason: ChaseReason::Formation
            }
        );
    }

    #[test]
    fn test_regroups_on_distant_allies() {
        let table = UnitTypeTable::default();
        let ledger = DamageLedger::new();
        let config = EngineConfig::default();
        let unit = mine(1, UnitKind::Light, 0, 0);
        let a = mine(2, UnitKind::Light, 8, 0);
        let b = mine(3, UnitKind::Light, 8, 2);
        let far = enemy(4, UnitKind::Light, 15, 15, 4);
        let enemies = [&far];
        let allies = [&unit, &a, &b];
        let v = view(&table, &ledger, &config, &enemies, &allies);
        assert_eq!(
            decide(&unit, table.get(unit.kind), &v, &AggressionGate::closed()),
            Decision::Regroup {
                centroid: Position::new(8, 1)
            }
        );
    }

    #[test]
    fn test_centroid_uses_integer_division() {
        let a = mine(1, UnitKind::Light, 0, 0);
        let b = mine(2, UnitKind::Light, 3, 1);
        assert_eq!(centroid(&[&a, &b]), Some(Position::new(1, 0)));
        assert_eq!(centroid(&[]), None);
    }
}
