//! Headless runner implementation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, BufRead, Write};

use skirmish_ai::prelude::*;
use skirmish_core::prelude::{JointAction, PlayerId, Snapshot, UnitTypeTable};
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::protocol::{Command, Response};

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Player the engine acts for.
    pub player: PlayerId,
    /// Tuning knobs.
    pub engine: EngineConfig,
    /// Unit stats.
    pub table: UnitTypeTable,
    /// Decide against a frozen clock so the budget never runs out.
    ///
    /// Used for replay verification, where answers must not depend on
    /// machine speed.
    pub frozen_clock: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            player: PlayerId(0),
            engine: EngineConfig::default(),
            table: UnitTypeTable::default(),
            frozen_clock: false,
        }
    }
}

impl RunnerConfig {
    /// Config acting for `player` with default tuning.
    pub fn for_player(player: PlayerId) -> Self {
        Self {
            player,
            ..Default::default()
        }
    }

    /// Use a frozen clock.
    pub fn with_frozen_clock(mut self) -> Self {
        self.frozen_clock = true;
        self
    }
}

/// One agent plus bookkeeping for the protocol.
pub struct Session {
    config: RunnerConfig,
    agent: Agent,
    decided: u64,
    last_tick: u64,
    hasher: DefaultHasher,
}

impl Session {
    /// Fresh session.
    pub fn new(config: RunnerConfig) -> Self {
        let agent = Agent::with_config(config.player, config.engine.clone(), config.table.clone());
        Self {
            config,
            agent,
            decided: 0,
            last_tick: 0,
            hasher: DefaultHasher::new(),
        }
    }

    /// Player this session acts for.
    pub fn player(&self) -> PlayerId {
        self.config.player
    }

    /// Ticks decided since the last reset.
    pub fn decided(&self) -> u64 {
        self.decided
    }

    /// Running hash over every joint action and successor state.
    pub fn state_hash(&self) -> u64 {
        self.hasher.clone().finish()
    }

    /// Decide one snapshot and return the tick output.
    pub fn decide(&mut self, snapshot: &Snapshot) -> (JointAction, TickReport) {
        let actions = if self.config.frozen_clock {
            self.agent
                .act_with_clock(snapshot, &SteppingClock::frozen())
        } else {
            self.agent.act(snapshot)
        };
        actions.hash(&mut self.hasher);
        self.agent.state().hash(&mut self.hasher);
        self.decided += 1;
        self.last_tick = snapshot.tick;

        let report = self
            .agent
            .last_report()
            .cloned()
            .unwrap_or_else(|| TickReport::new(snapshot.tick));
        debug!(
            tick = snapshot.tick,
            actions = actions.len(),
            attacks = report.attacks,
            budget_exhausted = report.budget_exhausted,
            "decided"
        );
        (actions, report)
    }

    /// Forget persistent state and the running hash.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Replace the tuning knobs and reset.
    pub fn configure(&mut self, engine: EngineConfig) -> Result<(), RunnerError> {
        engine.validate()?;
        self.config.engine = engine;
        self.reset();
        Ok(())
    }

    /// Handle one command, returning the response and whether to stop.
    pub fn handle(&mut self, command: Command) -> (Response, bool) {
        let name = command.name();
        match command {
            Command::Decide { snapshot } => {
                if let Err(e) = snapshot.validate() {
                    warn!(error = %e, "rejected snapshot");
                    return (Response::error(e.to_string(), Some(name)), false);
                }
                let (actions, report) = self.decide(&snapshot);
                let response = Response::Actions {
                    tick: snapshot.tick,
                    actions,
                    report,
                };
                (response, false)
            }
            Command::Reset => {
                self.reset();
                (Response::ack(name), false)
            }
            Command::Configure { config } => match self.configure(*config) {
                Ok(()) => (Response::ack(name), false),
                Err(e) => (Response::error(e.to_string(), Some(name)), false),
            },
            Command::State => (
                Response::State {
                    decided: self.decided,
                    state: self.agent.state().clone(),
                },
                false,
            ),
            Command::Hash => (
                Response::StateHash {
                    tick: self.last_tick,
                    hash: self.state_hash(),
                },
                false,
            ),
            Command::Quit => (Response::Bye, true),
        }
    }
}

/// Headless runner speaking the JSON-lines protocol.
pub struct HeadlessRunner {
    session: Session,
}

impl HeadlessRunner {
    /// Create a runner with default config.
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            session: Session::new(config),
        }
    }

    /// Session state, for inspection after a run.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Serve stdin/stdout until `quit` or end of input.
    pub fn run_stdio(&mut self) -> Result<u64, RunnerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Serve commands from `input`, writing one response line per command.
    ///
    /// Blank lines are skipped and malformed lines answered with an error.
    /// Returns the number of commands handled.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<u64, RunnerError> {
        info!(player = %self.session.player(), "runner ready");
        output.write_all(Response::ready(self.session.player()).to_json_line().as_bytes())?;
        output.flush()?;

        let mut handled = 0;
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (response, quit) = match Command::from_json(trimmed) {
                Ok(command) => {
                    handled += 1;
                    self.session.handle(command)
                }
                Err(e) => {
                    warn!(error = %e, "malformed command");
                    (Response::error(format!("Invalid command: {e}"), None), false)
                }
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
            if quit {
                break;
            }
        }

        info!(handled, decided = self.session.decided(), "runner stopped");
        Ok(handled)
    }
}

impl Default for HeadlessRunner {
    fn default() -> Self {
        Self::new()
    }
}
