//! End-to-end tick scenarios.

use std::collections::BTreeSet;
use std::time::Duration;

use skirmish_ai::construction::best_site;
use skirmish_ai::prelude::*;
use skirmish_core::prelude::*;
use skirmish_test_utils::determinism::{find_first_divergence, verify_agent_determinism};
use skirmish_test_utils::fixtures::{battlefield_16x16, opening_8x8, SnapshotBuilder, ME, THEM};

struct Host {
    config: EngineConfig,
    rules: StandardRules,
    finder: AStarStepFinder,
}

impl Host {
    fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            rules: StandardRules::default(),
            finder: AStarStepFinder::default(),
        }
    }

    fn collaborators<'a>(&'a self, clock: &'a dyn Clock) -> Collaborators<'a> {
        Collaborators {
            table: self.rules.table(),
            rules: &self.rules,
            finder: &self.finder,
            clock,
        }
    }

    fn run_with(&self, snapshot: &Snapshot, state: EngineState, clock: &dyn Clock) -> TickOutput {
        let input = TickInput { snapshot, me: ME };
        run_tick(input, state, &self.config, self.collaborators(clock))
    }

    fn run(&self, snapshot: &Snapshot) -> TickOutput {
        self.run_with(snapshot, EngineState::default(), &SteppingClock::frozen())
    }
}

/// Every owned unit has one legal action and no cell is claimed twice.
fn assert_consistent(snapshot: &Snapshot, actions: &JointAction) {
    let rules = StandardRules::default();
    let mut claimed: BTreeSet<Position> = snapshot
        .units
        .iter()
        .filter_map(|u| {
            let pending = u.pending?;
            pending.action.claimed_cell(u.position)
        })
        .collect();
    for unit in snapshot.units_of(ME) {
        assert!(actions.contains(unit.id), "{} has no action", unit.id);
        let action = actions.get(unit.id);
        assert!(rules.is_allowed(snapshot, unit, &action), "{} {action:?}", unit.id);
        if let Some(cell) = action.claimed_cell(unit.position) {
            assert!(claimed.insert(cell), "{cell} claimed twice");
        }
    }
    assert_eq!(actions.len(), snapshot.units_of(ME).count());
}

#[test]
fn test_lone_worker_harvests_and_returns() {
    let mut b = SnapshotBuilder::new(10, 10);
    b.own(ME, UnitKind::Base, 2, 2);
    let worker = b.own(ME, UnitKind::Worker, 3, 2);
    b.resource(4, 2, 20);
    let empty = b.clone().build();

    let host = Host::new();
    let output = host.run(&empty);
    assert_eq!(output.actions.get(worker), UnitAction::Harvest(Direction::Right));
    assert_eq!(output.report.attacks + output.report.chases, 0);
    assert_eq!(output.state.assignments.len(), 1);

    b.edit(worker, |u| u.cargo = 1);
    let loaded = b.build();
    let output = host.run_with(&loaded, output.state, &SteppingClock::frozen());
    assert_eq!(output.actions.get(worker), UnitAction::Return(Direction::Left));
    assert_consistent(&loaded, &output.actions);
}

#[test]
fn test_mutual_range_attacks() {
    let mut b = SnapshotBuilder::new(10, 10);
    let light = b.own(ME, UnitKind::Light, 3, 3);
    b.own(THEM, UnitKind::Light, 3, 4);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert_eq!(output.actions.get(light), UnitAction::Attack(Position::new(3, 4)));
    assert_eq!(output.report.attacks, 1);
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_ranged_steps_away_from_escaping_enemy() {
    let mut b = SnapshotBuilder::new(10, 10);
    let ranged = b.own(ME, UnitKind::Ranged, 3, 3);
    let enemy = b.own(THEM, UnitKind::Light, 3, 6);
    b.pending(enemy, UnitAction::Move(Direction::Down), 2);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    let UnitAction::Move(direction) = output.actions.get(ranged) else {
        panic!("expected a move, got {:?}", output.actions.get(ranged));
    };
    let predicted = Position::new(3, 7);
    let start = Position::new(3, 3);
    assert!(start.step(direction).manhattan(predicted) > start.manhattan(predicted));
    assert_eq!(direction, Direction::Up);
    assert_eq!(output.report.evades, 1);
}

#[test]
fn test_melee_holds_while_enemy_leaves_range() {
    let mut b = SnapshotBuilder::new(10, 10);
    let light = b.own(ME, UnitKind::Light, 3, 3);
    let enemy = b.own(THEM, UnitKind::Light, 3, 4);
    b.pending(enemy, UnitAction::Move(Direction::Down), 2);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert_eq!(output.actions.get(light), UnitAction::Noop);
    assert_eq!(output.report.chases, 0);
    assert_eq!(output.report.idles, 1);
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_cornered_ranged_holds_when_no_flight_cell() {
    let mut b = SnapshotBuilder::from_rows(&[
        "..........",
        "..........",
        "...#......",
        "..#.#.....",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
        "..........",
    ]);
    let ranged = b.own(ME, UnitKind::Ranged, 3, 3);
    let enemy = b.own(THEM, UnitKind::Light, 3, 6);
    b.pending(enemy, UnitAction::Move(Direction::Down), 2);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert_eq!(output.actions.get(ranged), UnitAction::Noop);
    assert_eq!(output.report.evades, 1);
    assert_eq!(output.report.attacks, 0);
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_third_attacker_skips_effectively_dead_target() {
    let mut b = SnapshotBuilder::new(10, 10);
    let first = b.own(ME, UnitKind::Light, 4, 3);
    let second = b.own(ME, UnitKind::Light, 4, 5);
    let third = b.own(ME, UnitKind::Light, 3, 4);
    b.own(THEM, UnitKind::Light, 4, 4);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    let target = UnitAction::Attack(Position::new(4, 4));
    assert_eq!(output.actions.get(first), target);
    assert_eq!(output.actions.get(second), target);
    assert_ne!(output.actions.get(third), target);
    assert_eq!(output.report.effectively_dead, 1);
}

#[test]
fn test_budget_exhaustion_falls_back() {
    let mut b = SnapshotBuilder::new(16, 16);
    for i in 0..6 {
        b.own(ME, UnitKind::Light, i, 0);
    }
    b.own(THEM, UnitKind::Heavy, 15, 15);
    let snapshot = b.build();

    let clock = SteppingClock::new(Duration::from_millis(40));
    let output = Host::new().run_with(&snapshot, EngineState::default(), &clock);
    assert!(output.report.budget_exhausted);
    assert!(output.report.fallbacks > 0);
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_threatened_harvester_is_released() {
    let mut b = SnapshotBuilder::new(10, 10);
    let base = b.own(ME, UnitKind::Base, 2, 2);
    let worker = b.own(ME, UnitKind::Worker, 3, 2);
    b.resource(4, 2, 20);
    b.own(THEM, UnitKind::Light, 3, 4);
    let snapshot = b.build();

    let mut state = EngineState::default();
    assert!(state.assignments.assign(worker, base, 2));
    let output = Host::new().run_with(&snapshot, state, &SteppingClock::frozen());

    assert_eq!(output.report.harvesters_released, 1);
    assert!(!output.state.assignments.is_assigned(worker));
    assert!(!matches!(output.actions.get(worker), UnitAction::Harvest(_)));
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_barracks_site_keeps_clear_of_resources() {
    let mut b = SnapshotBuilder::new(12, 12).bank(ME, 20);
    b.own(ME, UnitKind::Base, 5, 5);
    b.own(ME, UnitKind::Worker, 5, 7);
    b.resource(4, 4, 20);
    b.resource(6, 6, 20);
    let snapshot = b.build();

    let host = Host::new();
    let clock = SteppingClock::frozen();
    let roster = Roster::classify(&snapshot, ME);
    let ctx = TickContext::new(
        &snapshot,
        ME,
        &host.config,
        host.collaborators(&clock),
        roster,
        AggressionGate::closed(),
    );
    let choice = best_site(&ctx, &[]).expect("a site");
    assert_eq!(choice.site, Position::new(4, 6));
    for resource in [Position::new(4, 4), Position::new(6, 6)] {
        assert!(resource.chebyshev(choice.site) > 1);
    }
}

#[test]
fn test_baseless_side_places_a_base() {
    let mut b = SnapshotBuilder::new(10, 10).bank(ME, 10);
    let worker = b.own(ME, UnitKind::Worker, 3, 3);
    b.resource(5, 3, 20);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert_eq!(
        output.actions.get(worker),
        UnitAction::Produce {
            direction: Direction::Up,
            kind: UnitKind::Base
        }
    );
    assert_eq!(output.report.construction_orders, 1);
}

#[test]
fn test_spawn_avoids_cells_claimed_by_moves() {
    let mut b = SnapshotBuilder::new(10, 10).bank(ME, 5);
    let base = b.own(ME, UnitKind::Base, 2, 2);
    let walker = b.own(ME, UnitKind::Worker, 1, 1);
    b.pending(walker, UnitAction::Move(Direction::Right), 3);
    b.own(THEM, UnitKind::Light, 2, 0);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert_eq!(
        output.actions.get(base),
        UnitAction::Produce {
            direction: Direction::Down,
            kind: UnitKind::Worker
        }
    );
    assert_consistent(&snapshot, &output.actions);
}

#[test]
fn test_barracks_switch_to_ranged_after_heavy_threshold() {
    let mut b = SnapshotBuilder::new(12, 12).bank(ME, 10);
    let barracks = b.own(ME, UnitKind::Barracks, 5, 5);
    for x in 0..4 {
        b.own(ME, UnitKind::Heavy, x, 10);
    }
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert!(matches!(
        output.actions.get(barracks),
        UnitAction::Produce {
            kind: UnitKind::Ranged,
            ..
        }
    ));
}

#[test]
fn test_all_in_sends_workers_to_fight() {
    let mut b = SnapshotBuilder::new(10, 10);
    b.own(ME, UnitKind::Base, 1, 1);
    let worker = b.own(ME, UnitKind::Worker, 5, 5);
    b.own(THEM, UnitKind::Worker, 5, 6);
    let snapshot = b.build();

    let output = Host::new().run(&snapshot);
    assert!(output.report.all_in);
    assert_eq!(output.actions.get(worker), UnitAction::Attack(Position::new(5, 6)));
}

#[test]
fn test_agent_is_deterministic() {
    let snapshots = vec![opening_8x8(), battlefield_16x16(9), opening_8x8()];
    let config = EngineConfig::default();
    verify_agent_determinism(&snapshots, ME, &config, 3).assert_deterministic();
    assert_eq!(find_first_divergence(&snapshots, ME, &config), None);
}

#[test]
fn test_agent_keeps_state_between_ticks() {
    let mut agent = Agent::new(ME);
    let opening = opening_8x8();
    let actions = agent.act_with_clock(&opening, &SteppingClock::frozen());
    assert_consistent(&opening, &actions);
    assert_eq!(agent.state().assignments.len(), 1);
    assert_eq!(agent.last_report().map(|r| r.tick), Some(0));
}

#[test]
fn test_config_round_trips_through_ron() {
    let config = EngineConfig {
        aggression_level: Fixed::from_num(0.75),
        strength_metric: StrengthMetric::AverageDamage,
        guard_stations: true,
        ..EngineConfig::default()
    };
    let text = ron::to_string(&config).expect("serialize");
    let parsed = EngineConfig::from_ron_str(&text).expect("parse");
    assert_eq!(parsed, config);
}
