//! Headless runner for the skirmish decision engine.
//!
//! A host that is not written in Rust drives the engine through this crate:
//! snapshots go in as JSON, joint actions come back out. This enables:
//!
//! - **Live play**: a match host streams one snapshot per tick over stdin
//! - **CI verification**: replay a folder of recorded snapshots and check
//!   the engine answers identically every run
//! - **Profiling**: time tick latency on real positions
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the host (decide, reset, configure, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Serve one player over stdin/stdout
//! cargo run -p skirmish_headless -- serve --player 0
//!
//! # Decide a single snapshot file
//! cargo run -p skirmish_headless -- decide --snapshot data/opening.ron
//!
//! # Verify determinism across five runs
//! cargo run -p skirmish_headless -- verify --snapshot data/opening.ron --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod error;
pub mod loader;
pub mod protocol;
pub mod runner;

pub use batch::{collect_snapshots, run_batch, verify_determinism, BatchResults};
pub use error::RunnerError;
pub use protocol::{Command, Response};
pub use runner::{HeadlessRunner, RunnerConfig, Session};
