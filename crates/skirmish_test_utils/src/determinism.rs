//! Determinism testing utilities.
//!
//! The engine must produce the same joint action and the same successor
//! state for the same snapshot sequence, every run. Sources of
//! non-determinism it guards against:
//!
//! - **HashMap iteration order**: every bucket, map and set the engine
//!   iterates is ordered by unit id or position.
//! - **Randomness**: the deadlock nudge uses a `SmallRng` seeded from the
//!   configured seed and the tick.
//! - **Wall clock**: the budget reads a [`Clock`]; the harness uses a
//!   frozen [`SteppingClock`] so exhaustion never depends on machine speed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use skirmish_ai::prelude::*;
use skirmish_core::prelude::*;
use tracing::debug;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks decided per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process several times and compare final hashes.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Hashes the state
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for tick in 0..ticks {
            step(&mut state, tick);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Agent plus a running hash of everything it emitted.
struct Recorder {
    agent: Agent,
    clock: SteppingClock,
    hasher: DefaultHasher,
}

impl Recorder {
    fn new(me: PlayerId, config: &EngineConfig) -> Self {
        Self {
            agent: Agent::with_config(me, config.clone(), UnitTypeTable::default()),
            clock: SteppingClock::frozen(),
            hasher: DefaultHasher::new(),
        }
    }

    fn step(&mut self, snapshot: &Snapshot) -> u64 {
        let actions = self.agent.act_with_clock(snapshot, &self.clock);
        actions.hash(&mut self.hasher);
        self.agent.state().hash(&mut self.hasher);
        self.hasher.clone().finish()
    }
}

/// Feed the same snapshot sequence to fresh agents `runs` times and compare.
pub fn verify_agent_determinism(
    snapshots: &[Snapshot],
    me: PlayerId,
    config: &EngineConfig,
    runs: usize,
) -> DeterminismResult {
    verify_determinism(
        runs,
        snapshots.len() as u64,
        || (Recorder::new(me, config), 0),
        |(recorder, last), tick| {
            *last = recorder.step(&snapshots[tick as usize]);
        },
        |(_, last)| *last,
    )
}

/// Compare two agents snapshot by snapshot, finding the first divergence.
///
/// # Returns
///
/// `None` if both agents agree throughout, `Some(index)` of the first
/// snapshot where they differ.
pub fn find_first_divergence(
    snapshots: &[Snapshot],
    me: PlayerId,
    config: &EngineConfig,
) -> Option<usize> {
    let mut first = Recorder::new(me, config);
    let mut second = Recorder::new(me, config);
    let diverged = snapshots
        .iter()
        .position(|snapshot| first.step(snapshot) != second.step(snapshot));
    if let Some(index) = diverged {
        debug!(index, "agents diverged");
    }
    diverged
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
