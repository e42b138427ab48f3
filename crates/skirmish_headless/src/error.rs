//! Error types for the headless runner.

use skirmish_ai::config::ConfigError;
use skirmish_core::error::CoreError;
use thiserror::Error;

/// Errors raised while loading inputs or serving the protocol.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Reading or writing a stream or file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input could not be parsed.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot or unit table was rejected.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Engine config was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File extension is neither `.json` nor `.ron`.
    #[error("Unsupported file format for '{0}' (expected .json or .ron)")]
    UnsupportedFormat(String),
}
