//! Headless skirmish bot.
//!
//! This binary runs the decision engine without a game client, controlled
//! via JSON on stdin/stdout. Designed for match hosts, CI testing, and
//! replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Serve player 0 over stdin/stdout (default)
//! cargo run -p skirmish_headless
//!
//! # Decide one snapshot file and print the joint action
//! cargo run -p skirmish_headless -- decide --snapshot data/opening.ron
//!
//! # Decide every snapshot in a folder, in parallel
//! cargo run -p skirmish_headless -- batch --input recorded/ --output results/batch.json
//!
//! # Verify a recorded sequence decides identically across runs
//! cargo run -p skirmish_headless -- verify recorded/ --runs 5
//!
//! # Time tick latency
//! cargo run -p skirmish_headless -- bench --snapshot data/opening.ron --ticks 1000
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish_core::prelude::{PlayerId, Snapshot};
use skirmish_headless::{
    batch::{collect_snapshots, run_batch, verify_determinism},
    loader::{load_engine_config, load_snapshot, load_unit_table},
    runner::{HeadlessRunner, RunnerConfig, Session},
    RunnerError,
};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless skirmish bot for match hosts and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that builds an agent.
#[derive(Args, Clone, Default)]
struct EngineArgs {
    /// Player to act for
    #[arg(long, default_value = "0")]
    player: u8,

    /// Engine config (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unit table overrides (RON)
    #[arg(long)]
    units: Option<PathBuf>,

    /// Decide against a frozen clock (budget never runs out)
    #[arg(long)]
    frozen_clock: bool,
}

impl EngineArgs {
    fn runner_config(&self) -> Result<RunnerConfig, RunnerError> {
        Ok(RunnerConfig {
            player: PlayerId(self.player),
            engine: load_engine_config(self.config.as_deref())?,
            table: load_unit_table(self.units.as_deref())?,
            frozen_clock: self.frozen_clock,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON-lines protocol on stdin/stdout
    Serve {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Decide one snapshot and print the joint action
    Decide {
        /// Snapshot file (.json or .ron)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Decide every snapshot in a folder in parallel
    Batch {
        /// Folder of snapshot files
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long, default_value = "results/batch.json")]
        output: PathBuf,

        /// Maximum worker threads (0 = auto)
        #[arg(long, default_value = "0")]
        parallel: usize,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Verify determinism by replaying snapshots several times
    Verify {
        /// Snapshot files or folders, decided in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Decide one snapshot N times for benchmarking
    Bench {
        /// Snapshot file (.json or .ron)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Serve { engine }) => cmd_serve(&engine),
        Some(Commands::Decide {
            snapshot,
            pretty,
            engine,
        }) => cmd_decide(&snapshot, pretty, &engine),
        Some(Commands::Batch {
            input,
            output,
            parallel,
            engine,
        }) => cmd_batch(&input, &output, parallel, &engine),
        Some(Commands::Verify {
            paths,
            runs,
            engine,
        }) => cmd_verify(&paths, runs, &engine),
        Some(Commands::Bench {
            snapshot,
            ticks,
            engine,
        }) => cmd_bench(&snapshot, ticks, &engine),
        None => {
            // Default: serve player 0
            cmd_serve(&EngineArgs::default())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Serve the protocol until quit or end of input
fn cmd_serve(engine: &EngineArgs) -> Result<(), RunnerError> {
    tracing::info!("Starting protocol session");
    let mut runner = HeadlessRunner::with_config(engine.runner_config()?);
    runner.run_stdio()?;
    Ok(())
}

/// Decide a single snapshot
fn cmd_decide(path: &Path, pretty: bool, engine: &EngineArgs) -> Result<(), RunnerError> {
    let snapshot = load_snapshot(path)?;
    let mut session = Session::new(engine.runner_config()?);
    let (actions, report) = session.decide(&snapshot);

    let json = if pretty {
        serde_json::to_string_pretty(&actions)?
    } else {
        serde_json::to_string(&actions)?
    };
    println!("{json}");

    eprintln!("Tick {}: {} actions", report.tick, actions.len());
    eprintln!(
        "  Strength: {} vs {} (commit: {}, all-in: {})",
        report.my_strength, report.enemy_strength, report.commit, report.all_in
    );
    eprintln!(
        "  Combat: {} attack, {} evade, {} chase, {} regroup, {} idle",
        report.attacks, report.evades, report.chases, report.regroups, report.idles
    );
    if report.budget_exhausted {
        eprintln!("  Budget exhausted: {} fallbacks", report.fallbacks);
    }
    Ok(())
}

/// Decide a folder of snapshots
fn cmd_batch(
    input: &Path,
    output: &Path,
    parallel: usize,
    engine: &EngineArgs,
) -> Result<(), RunnerError> {
    let paths = collect_snapshots(input)?;
    if paths.is_empty() {
        tracing::warn!("No snapshot files in {}", input.display());
    }

    let results = run_batch(&paths, &engine.runner_config()?, parallel);
    results.save(output)?;

    eprintln!("\n=== Batch Complete ===");
    eprintln!("Decided: {}", results.entries.len());
    eprintln!("Failed: {}", results.errors.len());
    eprintln!("Budget exhausted: {}", results.exhausted());
    eprintln!("Duration: {:.2}s", results.duration_seconds);
    eprintln!("Results saved to: {}", output.display());
    Ok(())
}

/// Verify determinism across runs
fn cmd_verify(paths: &[PathBuf], runs: u32, engine: &EngineArgs) -> Result<(), RunnerError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collect_snapshots(path)?);
        } else {
            files.push(path.clone());
        }
    }
    let snapshots = files
        .iter()
        .map(|f| load_snapshot(f))
        .collect::<Result<Vec<Snapshot>, _>>()?;

    tracing::info!(
        "Verifying determinism: {} snapshots ({} runs)",
        snapshots.len(),
        runs
    );

    let hashes = verify_determinism(&snapshots, &engine.runner_config()?, runs);
    if hashes.windows(2).all(|w| w[0] == w[1]) {
        eprintln!("PASS: All {runs} runs produced identical decisions");
        if let Some(hash) = hashes.first() {
            eprintln!("  Hash: {hash:016x}");
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in hashes.iter().enumerate() {
            eprintln!("  Run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Benchmark tick latency
fn cmd_bench(path: &Path, ticks: u64, engine: &EngineArgs) -> Result<(), RunnerError> {
    tracing::info!("Running {} tick benchmark", ticks);

    let snapshot = load_snapshot(path)?;
    let config = engine.runner_config()?;
    let budget = config.engine.budget();
    let mut session = Session::new(config);

    let mut slowest = Duration::ZERO;
    let mut exhausted = 0u64;
    let start = Instant::now();
    for _ in 0..ticks {
        let tick_start = Instant::now();
        let (_, report) = session.decide(&snapshot);
        slowest = slowest.max(tick_start.elapsed());
        if report.budget_exhausted {
            exhausted += 1;
        }
    }
    let elapsed = start.elapsed();

    let per_tick_us = if ticks > 0 {
        elapsed.as_secs_f64() * 1_000_000.0 / ticks as f64
    } else {
        0.0
    };

    eprintln!("\n=== Benchmark Results ===");
    eprintln!("Ticks: {ticks}");
    eprintln!("Units: {}", snapshot.units.len());
    eprintln!("Total time: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Mean: {per_tick_us:.1}us/tick");
    eprintln!("Slowest: {:.1}us", slowest.as_secs_f64() * 1_000_000.0);
    eprintln!("Budget: {}ms, exhausted on {exhausted} ticks", budget.as_millis());
    Ok(())
}
