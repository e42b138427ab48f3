//! Tick execution context.
//!
//! Everything a tick's decisions share lives here: the snapshot, this
//! tick's classification and gate, the reservation table, the damage
//! ledger, the resources still unspent and the joint action being built.
//! The context is created at the start of a tick and dropped at its end;
//! nothing in it outlives the tick.

use std::collections::BTreeSet;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use skirmish_core::prelude::*;
use tracing::{debug, trace};

use crate::aggression::AggressionGate;
use crate::budget::{Clock, TickBudget};
use crate::classify::Roster;
use crate::config::{EngineConfig, MapProfile};
use crate::defense::DefenseRings;
use crate::ledger::DamageLedger;
use crate::report::TickReport;
use crate::reservation::ReservationTable;

/// Host-side collaborators the engine consults but does not own.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Unit statistics.
    pub table: &'a UnitTypeTable,
    /// Legality oracle.
    pub rules: &'a dyn ActionRules,
    /// Pathfinding fallback.
    pub finder: &'a dyn StepFinder,
    /// Wall clock for the budget.
    pub clock: &'a dyn Clock,
}

/// Working state of one tick.
pub struct TickContext<'a> {
    /// The snapshot being decided on.
    pub snapshot: &'a Snapshot,
    /// Our player.
    pub me: PlayerId,
    /// Unit statistics.
    pub table: &'a UnitTypeTable,
    /// Tuning knobs.
    pub config: &'a EngineConfig,
    /// Map-size dependent parameters.
    pub profile: MapProfile,
    /// This tick's classification.
    pub roster: Roster<'a>,
    /// Offense gate.
    pub gate: AggressionGate,
    /// Defense rings of our bases.
    pub rings: DefenseRings,
    /// Our bases found isolated this tick.
    pub isolated: BTreeSet<UnitId>,
    /// Whether any of our bases was ever isolated.
    pub ever_isolated: bool,
    /// Cells claimed this tick.
    pub reservations: ReservationTable,
    /// Damage queued this tick.
    pub ledger: DamageLedger,
    /// Decision counters.
    pub report: TickReport,
    rules: &'a dyn ActionRules,
    finder: &'a dyn StepFinder,
    budget: TickBudget<'a>,
    rng: SmallRng,
    actions: JointAction,
    available: i32,
}

impl<'a> TickContext<'a> {
    /// Seed a context: reservations from in-progress moves and productions,
    /// the ledger from in-progress attacks, and resources net of
    /// productions already under way.
    #[must_use]
    pub fn new(
        snapshot: &'a Snapshot,
        me: PlayerId,
        config: &'a EngineConfig,
        collaborators: Collaborators<'a>,
        roster: Roster<'a>,
        gate: AggressionGate,
    ) -> Self {
        let table = collaborators.table;
        let committed: i32 = snapshot
            .units_of(me)
            .filter_map(|u| match u.pending?.action {
                UnitAction::Produce { kind, .. } => Some(table.get(kind).cost),
                _ => None,
            })
            .sum();
        let mut report = TickReport::new(snapshot.tick);
        report.my_strength = gate.my_strength;
        report.enemy_strength = gate.enemy_strength;
        report.commit = gate.commit;
        report.all_in = gate.all_in;

        Self {
            snapshot,
            me,
            table,
            config,
            profile: MapProfile::for_width(snapshot.width()),
            roster,
            gate,
            rings: DefenseRings::default(),
            isolated: BTreeSet::new(),
            ever_isolated: false,
            reservations: ReservationTable::seeded(snapshot),
            ledger: DamageLedger::seeded(snapshot, me, table),
            report,
            rules: collaborators.rules,
            finder: collaborators.finder,
            budget: TickBudget::new(collaborators.clock, config.budget(), config.reserve()),
            rng: SmallRng::seed_from_u64(config.nudge_seed ^ snapshot.tick),
            actions: JointAction::new(),
            available: snapshot.banked(me) - committed,
        }
    }

    /// Statistics of a unit's type.
    #[must_use]
    pub fn stats(&self, unit: &Unit) -> &'a UnitStats {
        self.table.get(unit.kind)
    }

    /// Resources not yet spent or earmarked.
    #[must_use]
    pub const fn available(&self) -> i32 {
        self.available
    }

    /// Earmark resources for a builder still walking to its site.
    pub fn earmark(&mut self, amount: i32) {
        self.available -= amount;
    }

    /// Whether the unit already has an action this tick.
    #[must_use]
    pub fn has_action(&self, unit: UnitId) -> bool {
        self.actions.contains(unit)
    }

    /// The action recorded so far for a unit.
    #[must_use]
    pub fn action_of(&self, unit: UnitId) -> UnitAction {
        self.actions.get(unit)
    }

    /// Poll the wall-clock budget.
    pub fn budget_exhausted(&mut self) -> bool {
        let exhausted = self.budget.is_exhausted();
        if exhausted && !self.report.budget_exhausted {
            debug!(tick = self.snapshot.tick, "tick budget exhausted, falling back");
            self.report.budget_exhausted = true;
        }
        exhausted
    }

    /// Record an action if it is legal, the unit has none yet, the
    /// destination is unclaimed and, for production, it is affordable.
    ///
    /// Claims the destination and spends the cost on success.
    pub fn issue(&mut self, unit: &Unit, action: UnitAction) -> bool {
        if self.actions.contains(unit.id) {
            return false;
        }
        let cost = match action {
            UnitAction::Produce { kind, .. } => self.table.get(kind).cost,
            _ => 0,
        };
        if cost > self.available {
            return false;
        }
        let claimed = action.claimed_cell(unit.position);
        if claimed.is_some_and(|cell| self.reservations.is_reserved(cell)) {
            return false;
        }
        if !self.rules.is_allowed(self.snapshot, unit, &action) {
            trace!(unit = %unit.id, ?action, "rejected by rules");
            return false;
        }
        if let Some(cell) = claimed {
            self.reservations.reserve(cell);
        }
        self.available -= cost;
        self.actions.insert(unit.id, action)
    }

    /// Explicitly do nothing this tick.
    pub fn hold(&mut self, unit: &Unit) {
        self.actions.insert(unit.id, UnitAction::Noop);
    }

    /// Cheapest legal action for a unit the budget no longer covers.
    pub fn fallback(&mut self, unit: &Unit) {
        if self.actions.insert(unit.id, UnitAction::Noop) {
            self.report.fallbacks += 1;
        }
    }

    /// Take one step towards `goal`. Returns `false` if no step was issued.
    pub fn move_toward(&mut self, unit: &Unit, goal: PathGoal) -> bool {
        if goal.is_reached(unit.position) {
            return false;
        }
        let step = self
            .finder
            .find_step(self.snapshot, unit, goal, &self.reservations);
        match step {
            Some(direction) => self.issue(unit, UnitAction::Move(direction)),
            None => false,
        }
    }

    /// Step onto a random free neighbour to break a movement deadlock.
    pub fn nudge(&mut self, unit: &Unit) -> bool {
        let options: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|d| self.reservations.is_free(self.snapshot, unit.position.step(*d)))
            .collect();
        let Some(&direction) = options.choose(&mut self.rng) else {
            return false;
        };
        let moved = self.issue(unit, UnitAction::Move(direction));
        if moved {
            self.report.nudges += 1;
        }
        moved
    }

    /// Final legality sweep. Every unit we own gets exactly one action;
    /// anything the rules reject becomes a no-op.
    #[must_use]
    pub fn finish(mut self) -> (JointAction, TickReport) {
        let mut joint = JointAction::new();
        for unit in self.snapshot.units_of(self.me) {
            let action = self.actions.get(unit.id);
            if self.rules.is_allowed(self.snapshot, unit, &action) {
                joint.insert(unit.id, action);
            } else {
                debug!(unit = %unit.id, ?action, "illegal action replaced by no-op");
                self.report.sweep_rejections += 1;
                joint.insert(unit.id, UnitAction::Noop);
            }
        }
        (joint, self.report)
    }
}
