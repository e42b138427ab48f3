//! JSON protocol between a match host and the headless runner.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the host
//! **Output (stdout):** One response per command
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","player":0}`
//! 2. Host sends one `decide` per tick with the observed snapshot
//! 3. Runner answers with the joint action and the tick report
//! 4. On `quit`, runner outputs `{"type":"bye"}` and exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","player":0}
//! -> {"cmd":"decide","snapshot":{"tick":0,"terrain":{...},"units":[...]}}
//! <- {"type":"actions","tick":0,"actions":{"2":{"harvest":"Right"}},"report":{...}}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":0,"hash":1234567890}
//! -> {"cmd":"reset"}
//! <- {"type":"ack","cmd":"reset"}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use skirmish_ai::config::EngineConfig;
use skirmish_ai::engine::EngineState;
use skirmish_ai::report::TickReport;
use skirmish_core::action::JointAction;
use skirmish_core::snapshot::Snapshot;
use skirmish_core::unit::PlayerId;

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Host -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Decide the joint action for one snapshot.
    Decide {
        /// Observed state of the current tick.
        snapshot: Box<Snapshot>,
    },

    /// Forget harvest assignments and isolation memory.
    Reset,

    /// Replace the tuning knobs; implies a reset.
    Configure {
        /// New tuning.
        config: Box<EngineConfig>,
    },

    /// Query the state carried into the next tick.
    State,

    /// Running hash of every decision so far (for determinism checks).
    Hash,

    /// Shut the runner down.
    Quit,
}

// ============================================================================
// Output Responses (Runner -> Host)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Player the runner acts for.
        player: PlayerId,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command acknowledged.
        cmd: String,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command that failed, when it could be parsed.
        cmd: Option<String>,
    },

    /// Joint action for one snapshot.
    Actions {
        /// Snapshot tick.
        tick: u64,
        /// One action per owned unit.
        actions: JointAction,
        /// Decision counters.
        report: TickReport,
    },

    /// Persistent engine state.
    State {
        /// Ticks decided since the last reset.
        decided: u64,
        /// State carried into the next tick.
        state: EngineState,
    },

    /// Running decision hash for determinism verification.
    StateHash {
        /// Tick of the last decided snapshot.
        tick: u64,
        /// Hash over every joint action and successor state so far.
        hash: u64,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(player: PlayerId) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            player,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Decide { .. } => "decide",
            Self::Reset => "reset",
            Self::Configure { .. } => "configure",
            Self::State => "state",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::prelude::{Direction, Fixed, UnitAction, UnitId};

    #[test]
    fn test_parse_decide_command() {
        let json = r#"{"cmd":"decide","snapshot":{"tick":7,"terrain":{"width":2,"height":2,"cells":["Open","Open","Open","Wall"]},"units":[{"id":1,"owner":0,"kind":"Worker","position":{"x":0,"y":0},"hitpoints":1}],"resources":[{"player":0,"amount":4}]}}"#;
        let cmd = Command::from_json(json).unwrap();
        let Command::Decide { snapshot } = cmd else {
            panic!("expected decide");
        };
        assert_eq!(snapshot.tick, 7);
        assert_eq!(snapshot.units.len(), 1);
        assert_eq!(snapshot.banked(PlayerId(0)), 4);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_parse_unit_commands() {
        assert!(matches!(
            Command::from_json(r#"{"cmd":"reset"}"#).unwrap(),
            Command::Reset
        ));
        assert!(matches!(
            Command::from_json(r#"{"cmd":"quit"}"#).unwrap(),
            Command::Quit
        ));
        assert!(Command::from_json(r#"{"cmd":"tick"}"#).is_err());
    }

    #[test]
    fn test_configure_uses_defaults_for_missing_knobs() {
        let json = r#"{"cmd":"configure","config":{"aggression_level":0.5,"guard_stations":true}}"#;
        let Command::Configure { config } = Command::from_json(json).unwrap() else {
            panic!("expected configure");
        };
        assert_eq!(config.aggression_level, Fixed::from_num(0.5));
        assert!(config.guard_stations);
        assert_eq!(config.budget_ms, EngineConfig::default().budget_ms);
    }

    #[test]
    fn test_serialize_actions_response() {
        let mut actions = JointAction::new();
        actions.insert(UnitId(2), UnitAction::Harvest(Direction::Right));
        let resp = Response::Actions {
            tick: 12,
            actions,
            report: TickReport::new(12),
        };
        let json = resp.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"actions""#));
        assert!(json.contains(r#""tick":12"#));
        assert!(json.contains(r#""2":{"harvest":"Right"}"#));
    }

    #[test]
    fn test_error_response() {
        let json = Response::error("bad snapshot", Some("decide")).to_json_line();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""cmd":"decide""#));
    }
}
