//! Tick driver.
//!
//! Runs the components in a fixed order and threads persistent state
//! through:
//!
//! 1. Prune persistent state against the snapshot
//! 2. Classify units
//! 3. Isolation check and defense rings
//! 4. Aggression gate
//! 5. Seed the tick context
//! 6. Construction
//! 7. Harvesting
//! 8. Production
//! 9. Engagement
//! 10. Legality sweep

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use skirmish_core::prelude::*;
use tracing::{debug, info};

use crate::aggression;
use crate::budget::{Clock, SystemClock};
use crate::classify::Roster;
use crate::config::{EngineConfig, MapProfile};
use crate::construction;
use crate::context::{Collaborators, TickContext};
use crate::defense::{is_isolated, DefenseRings, IsolationMemory};
use crate::engagement;
use crate::harvest::{self, HarvestAssignments};
use crate::production;
use crate::report::TickReport;

/// Everything the engine remembers between ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineState {
    /// Worker → base harvest assignments.
    pub assignments: HarvestAssignments,
    /// Bases that were ever cut off from the enemy.
    pub isolation: IsolationMemory,
}

/// One tick's input.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Observed state.
    pub snapshot: &'a Snapshot,
    /// Player we act for.
    pub me: PlayerId,
}

/// One tick's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    /// One action per owned unit.
    pub actions: JointAction,
    /// State to pass into the next tick.
    pub state: EngineState,
    /// What was decided.
    pub report: TickReport,
}

/// Run one tick.
///
/// `state` is consumed and the successor state returned; nothing outside
/// the output is changed.
#[must_use]
pub fn run_tick(
    input: TickInput<'_>,
    state: EngineState,
    config: &EngineConfig,
    collaborators: Collaborators<'_>,
) -> TickOutput {
    let TickInput { snapshot, me } = input;
    let mut next = state;

    let roster = Roster::classify(snapshot, me);
    next.assignments.prune(&roster);
    let alive_bases: BTreeSet<UnitId> = roster.own.bases.iter().map(|b| b.id).collect();
    next.isolation.prune(&alive_bases);

    let mut isolated = BTreeSet::new();
    for base in &roster.own.bases {
        let cut_off = is_isolated(snapshot, base, me);
        next.isolation.observe(base.id, cut_off);
        if cut_off {
            isolated.insert(base.id);
        }
    }
    let profile = MapProfile::for_width(snapshot.width());
    let rings = DefenseRings::build(snapshot, &roster, profile.defense_distance);

    let gate = aggression::estimate(
        &roster.own,
        &roster.enemy,
        collaborators.table,
        config,
        snapshot.banked(me),
        snapshot.has_resource_fields(),
    );

    let mut ctx = TickContext::new(snapshot, me, config, collaborators, roster, gate);
    ctx.isolated = isolated;
    ctx.ever_isolated = next.isolation.any();
    ctx.rings = rings;

    construction::plan(&mut ctx);

    let fighters = if ctx.gate.all_in {
        for worker in ctx.roster.own.workers() {
            next.assignments.release(worker.id);
        }
        ctx.roster
            .own
            .workers_idle
            .iter()
            .copied()
            .filter(|w| !ctx.has_action(w.id))
            .collect()
    } else {
        harvest::assign_workers(&mut ctx, &mut next.assignments);
        harvest::drive_workers(&mut ctx, &mut next.assignments)
    };

    production::schedule(&mut ctx);
    engagement::arbitrate(&mut ctx, &fighters);

    let (actions, report) = ctx.finish();
    debug!(
        tick = report.tick,
        commit = report.commit,
        all_in = report.all_in,
        attacks = report.attacks,
        chases = report.chases,
        harvest = report.harvest_actions,
        trained = report.trained,
        fallbacks = report.fallbacks,
        "tick decided"
    );

    TickOutput {
        actions,
        state: next,
        report,
    }
}

/// A bot bound to one player, holding its own state between ticks.
pub struct Agent {
    player: PlayerId,
    config: EngineConfig,
    rules: StandardRules,
    finder: AStarStepFinder,
    state: EngineState,
    last_report: Option<TickReport>,
}

impl Agent {
    /// Agent with default tuning and the standard unit table.
    #[must_use]
    pub fn new(player: PlayerId) -> Self {
        Self::with_config(player, EngineConfig::default(), UnitTypeTable::default())
    }

    /// Agent with explicit tuning and unit table.
    #[must_use]
    pub fn with_config(player: PlayerId, config: EngineConfig, table: UnitTypeTable) -> Self {
        info!(player = %player, "agent created");
        Self {
            player,
            finder: AStarStepFinder::new(config.max_path_expansions),
            config,
            rules: StandardRules::new(table),
            state: EngineState::default(),
            last_report: None,
        }
    }

    /// Decide this tick's joint action against the wall clock.
    pub fn act(&mut self, snapshot: &Snapshot) -> JointAction {
        let clock = SystemClock::start();
        self.act_with_clock(snapshot, &clock)
    }

    /// Decide this tick's joint action against a caller-supplied clock.
    pub fn act_with_clock(&mut self, snapshot: &Snapshot, clock: &dyn Clock) -> JointAction {
        let collaborators = Collaborators {
            table: self.rules.table(),
            rules: &self.rules,
            finder: &self.finder,
            clock,
        };
        let input = TickInput {
            snapshot,
            me: self.player,
        };
        let state = std::mem::take(&mut self.state);
        let output = run_tick(input, state, &self.config, collaborators);
        self.state = output.state;
        self.last_report = Some(output.report);
        output.actions
    }

    /// Player this agent acts for.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Tuning knobs.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State carried into the next tick.
    #[must_use]
    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    /// Report of the most recent tick.
    #[must_use]
    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }
}
