//! Backoff policy for restart delays.
//!
//! [`BackoffPolicy`] controls how the delay before the next restart grows
//! after repeated failures. It is parameterized by:
//! - [`BackoffPolicy::first`] — the initial delay;
//! - [`BackoffPolicy::factor`] — the multiplicative growth factor;
//! - [`BackoffPolicy::max`] — the cap.
//!
//! The delay for attempt `n` (0-indexed) is `first × factor^n`, clamped
//! to `max`, with jitter applied last. The base is derived purely from
//! the attempt number, so jitter output never feeds back into subsequent
//! delays.

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first restart.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Exponential backoff: `first = 2s`, `factor = 2.0`, `max = 60s`,
    /// no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(2),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// The base is `first × factor^attempt`, clamped to [`BackoffPolicy::max`];
    /// overflow and non-finite intermediates also clamp to `max`.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !raw_secs.is_finite() || raw_secs < 0.0 || raw_secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(raw_secs)
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next(0), Duration::from_secs(2));
        assert_eq!(policy.next(1), Duration::from_secs(4));
        assert_eq!(policy.next(2), Duration::from_secs(8));
        assert_eq!(policy.next(3), Duration::from_secs(16));
        assert_eq!(policy.next(4), Duration::from_secs(32));
        // 2s * 2^5 = 64s clamps to the 60s cap.
        assert_eq!(policy.next(5), Duration::from_secs(60));
    }

    #[test]
    fn constant_factor_stays_flat() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        for attempt in 0..10 {
            assert_eq!(policy.next(attempt), Duration::from_millis(500));
        }
    }

    #[test]
    fn first_exceeding_max_clamps() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempt_clamps_to_max() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next(100), Duration::from_secs(60));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 1.0,
            jitter: JitterPolicy::Full,
        };
        for attempt in 0..50 {
            assert!(policy.next(attempt) <= Duration::from_secs(1));
        }
    }

    #[test]
    fn equal_jitter_stays_in_upper_half() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 1.0,
            jitter: JitterPolicy::Equal,
        };
        for attempt in 0..50 {
            let d = policy.next(attempt);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_secs(1));
        }
    }
}
