//! Wall-clock budget of one tick.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of elapsed time since the tick started.
pub trait Clock {
    /// Time elapsed since the tick started.
    fn elapsed(&self) -> Duration;
}

/// Real time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Start measuring now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Clock that advances a fixed step every time it is read.
///
/// Makes budget exhaustion reproducible in tests and benchmarks.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    now: Cell<Duration>,
    step: Duration,
}

impl SteppingClock {
    /// Start at zero and advance by `step` per reading.
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }

    /// A clock that never advances.
    #[must_use]
    pub const fn frozen() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Clock for SteppingClock {
    fn elapsed(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Budget polled before each expensive evaluation.
pub struct TickBudget<'c> {
    clock: &'c dyn Clock,
    limit: Duration,
    reserve: Duration,
    exhausted: bool,
}

impl<'c> TickBudget<'c> {
    /// Budget of `limit`, falling back once less than `reserve` remains.
    #[must_use]
    pub fn new(clock: &'c dyn Clock, limit: Duration, reserve: Duration) -> Self {
        Self {
            clock,
            limit,
            reserve,
            exhausted: false,
        }
    }

    /// Time left before the hard limit.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.clock.elapsed())
    }

    /// Whether the fallback path must be taken.
    ///
    /// Latches: once exhausted, the budget stays exhausted for the tick.
    pub fn is_exhausted(&mut self) -> bool {
        if !self.exhausted && self.remaining() < self.reserve {
            self.exhausted = true;
        }
        self.exhausted
    }
}
