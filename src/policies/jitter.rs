//! Jitter for restart delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that a fleet of
//! services knocked over by the same cause does not restart in lockstep.
//!
//! - [`JitterPolicy::None`] — exact delays, predictable timing
//! - [`JitterPolicy::Full`] — random delay in `[0, d]`
//! - [`JitterPolicy::Equal`] — `d/2 + random[0, d/2]` (balanced)

use std::time::Duration;

use rand::Rng;

/// Randomization strategy for restart delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    #[default]
    None,
    /// Random delay in `[0, delay]`; most aggressive spreading.
    Full,
    /// `delay/2 + random[0, delay/2]`; preserves most of the delay while
    /// still decorrelating restarts.
    Equal,
}

impl JitterPolicy {
    /// Applies this jitter strategy to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=ms))
}

fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let extra = if half == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=half)
    };
    Duration::from_millis(half + extra)
}
