//! Two-tier readiness verification schedule.
//!
//! The verifier runs `outer_attempts` rounds; each round issues up to
//! `inner_polls` probe invocations spaced `inner_interval` apart, and
//! unsuccessful rounds are separated by `outer_backoff`. The defaults
//! (3 × 10, 2s polls, 5s between rounds) reproduce the classic
//! "retry the login check three times, polling status every two seconds"
//! shape without hard-coding any of the constants.

use std::time::Duration;

/// Schedule for two-tier readiness verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Number of full verification rounds.
    pub outer_attempts: u32,
    /// Probe invocations per round.
    pub inner_polls: u32,
    /// Delay between consecutive polls within a round.
    pub inner_interval: Duration,
    /// Delay between unsuccessful rounds.
    pub outer_backoff: Duration,
}

impl Default for ProbePolicy {
    /// `outer_attempts = 3`, `inner_polls = 10`, `inner_interval = 2s`,
    /// `outer_backoff = 5s`.
    fn default() -> Self {
        Self {
            outer_attempts: 3,
            inner_polls: 10,
            inner_interval: Duration::from_secs(2),
            outer_backoff: Duration::from_secs(5),
        }
    }
}

impl ProbePolicy {
    /// Total probe invocations before the verifier reports exhaustion.
    pub fn total_polls(&self) -> u32 {
        self.outer_attempts.saturating_mul(self.inner_polls)
    }
}
