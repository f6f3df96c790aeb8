//! Fixed-budget status polling

use crate::utils::errors::Result;
use std::fmt;
use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one status observation, or of a whole polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Succeeded,
    Failed,
    TimedOut,
}

impl PollOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollOutcome::Pending => "pending",
            PollOutcome::Succeeded => "succeeded",
            PollOutcome::Failed => "failed",
            PollOutcome::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Attempt budget and sleep interval for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollingConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent sleeping, excluding command latency
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }

    /// Call `check` until it reports a terminal outcome or the budget runs out.
    ///
    /// `check` receives the 1-based attempt number. An `Err` stops polling
    /// immediately; only `Pending` is retried. The sleep happens between
    /// attempts, never after the last one. Returns the terminal outcome, or
    /// `TimedOut` once `max_attempts` checks stayed pending.
    pub fn poll<F>(&self, mut check: F) -> Result<PollOutcome>
    where
        F: FnMut(u32) -> Result<PollOutcome>,
    {
        for attempt in 1..=self.max_attempts {
            let outcome = check(attempt)?;
            if outcome.is_terminal() {
                return Ok(outcome);
            }

            tracing::debug!(attempt, max_attempts = self.max_attempts, outcome = %outcome, "not finished yet");
            if attempt < self.max_attempts {
                thread::sleep(self.interval);
            }
        }

        Ok(PollOutcome::TimedOut)
    }
}
