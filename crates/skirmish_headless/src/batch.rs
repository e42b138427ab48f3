//! Batch decisions over a folder of snapshots.
//!
//! Each snapshot is decided by a fresh agent, so files are independent and
//! run in parallel using rayon. Useful for regression sweeps over recorded
//! positions.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use skirmish_ai::prelude::*;
use skirmish_core::prelude::{JointAction, PlayerId, Snapshot};
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::loader::{is_snapshot_file, load_snapshot};
use crate::runner::{RunnerConfig, Session};

/// Decision for one snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Source file.
    pub source: String,
    /// Snapshot tick.
    pub tick: u64,
    /// Units we owned.
    pub owned: usize,
    /// The joint action.
    pub actions: JointAction,
    /// Decision counters.
    pub report: TickReport,
}

/// A snapshot that could not be decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Source file.
    pub source: String,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Player decided for.
    pub player: PlayerId,
    /// Decisions, in file order.
    pub entries: Vec<BatchEntry>,
    /// Files that failed to load.
    pub errors: Vec<BatchError>,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Ticks whose budget ran out.
    pub fn exhausted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.report.budget_exhausted)
            .count()
    }
}

/// Snapshot files directly inside `dir`, sorted by name.
pub fn collect_snapshots(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_snapshot_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Decide every file with a fresh agent.
///
/// `parallel` caps the worker threads; zero uses rayon's default.
pub fn run_batch(paths: &[PathBuf], config: &RunnerConfig, parallel: usize) -> BatchResults {
    let start = Instant::now();
    info!(files = paths.len(), player = %config.player, "starting batch");

    if parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(parallel)
            .build_global()
            .ok(); // Ignore if already set
    }

    let outcomes: Vec<Result<BatchEntry, BatchError>> = paths
        .par_iter()
        .map(|path| decide_file(path, config))
        .collect();

    let mut entries = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(entry) => entries.push(entry),
            Err(error) => errors.push(error),
        }
    }

    let results = BatchResults {
        player: config.player,
        entries,
        errors,
        duration_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        decided = results.entries.len(),
        failed = results.errors.len(),
        exhausted = results.exhausted(),
        seconds = results.duration_seconds,
        "batch complete"
    );
    results
}

/// Replay `snapshots` through fresh sessions `runs` times.
///
/// Returns the final decision hash of every run; a deterministic engine
/// yields identical hashes. The clock is frozen for every run.
pub fn verify_determinism(snapshots: &[Snapshot], config: &RunnerConfig, runs: u32) -> Vec<u64> {
    let config = config.clone().with_frozen_clock();
    (0..runs)
        .map(|run| {
            let mut session = Session::new(config.clone());
            for snapshot in snapshots {
                session.decide(snapshot);
            }
            let hash = session.state_hash();
            debug!(run, hash, "verification run");
            hash
        })
        .collect()
}

fn decide_file(path: &Path, config: &RunnerConfig) -> Result<BatchEntry, BatchError> {
    let source = path.display().to_string();
    let snapshot = load_snapshot(path).map_err(|e| {
        warn!(source = %source, error = %e, "snapshot skipped");
        BatchError {
            source: source.clone(),
            message: e.to_string(),
        }
    })?;

    let mut session = Session::new(config.clone());
    let (actions, report) = session.decide(&snapshot);
    Ok(BatchEntry {
        source,
        tick: snapshot.tick,
        owned: snapshot.units_of(config.player).count(),
        actions,
        report,
    })
}
