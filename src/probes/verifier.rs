//! Two-tier readiness verification loop.
//!
//! [`verify`] drives a [`Probe`] through the schedule described by a
//! [`ProbePolicy`]:
//!
//! ```text
//! for round in 0..outer_attempts {
//!   for poll in 0..inner_polls {
//!     probe.check() ── ready? ──► Verdict::Ready
//!     sleep(inner_interval)            (cancellable)
//!   }
//!   sleep(outer_backoff)               (between rounds, cancellable)
//! }
//! ──► Verdict::Exhausted
//! ```
//!
//! ## Rules
//! - `Ready` is returned as soon as **any** inner poll succeeds.
//! - `Exhausted` is returned only after every round consumed all of its
//!   polls: exactly `outer_attempts × inner_polls` probe invocations.
//! - Cancellation aborts the current sleep immediately and issues no
//!   further probes.

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::policies::ProbePolicy;

use super::probe::Probe;

/// Outcome of a verification run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// A poll succeeded; the service reached its ready state.
    Ready,
    /// Every outer attempt and inner poll was consumed without success.
    Exhausted,
    /// Shutdown was requested while verification was in progress.
    Canceled,
}

/// Runs the two-tier verification loop for `probe` under `policy`.
///
/// Suspends between polls and between rounds; never busy-spins. The
/// `cancel` token is checked before every probe invocation and aborts
/// any in-progress sleep.
pub async fn verify(
    probe: &dyn Probe,
    policy: &ProbePolicy,
    cancel: &CancellationToken,
) -> Verdict {
    for round in 0..policy.outer_attempts {
        for poll in 0..policy.inner_polls {
            if cancel.is_cancelled() {
                return Verdict::Canceled;
            }
            if probe.check().await {
                return Verdict::Ready;
            }
            // No sleep after the final poll of a round; the outer backoff
            // (or exhaustion) takes over.
            if poll + 1 < policy.inner_polls
                && !cancellable_sleep(policy.inner_interval, cancel).await
            {
                return Verdict::Canceled;
            }
        }
        if round + 1 < policy.outer_attempts
            && !cancellable_sleep(policy.outer_backoff, cancel).await
        {
            return Verdict::Canceled;
        }
    }
    Verdict::Exhausted
}

/// Sleeps for `dur`, returning false if cancelled first.
async fn cancellable_sleep(dur: std::time::Duration, cancel: &CancellationToken) -> bool {
    select! {
        _ = time::sleep(dur) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::probes::FnProbe;

    fn fast_policy() -> ProbePolicy {
        ProbePolicy {
            outer_attempts: 3,
            inner_polls: 10,
            inner_interval: Duration::from_secs(2),
            outer_backoff: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_exactly_n_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let probe = FnProbe::new(move || {
            let c = c.clone();
            async move { c.fetch_add(1, Ordering::SeqCst) + 1 == 4 }
        });

        let cancel = CancellationToken::new();
        let verdict = verify(&probe, &fast_policy(), &cancel).await;

        assert_eq!(verdict, Verdict::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_success_skips_all_sleeps() {
        let probe = FnProbe::new(|| async { true });
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();

        assert_eq!(verify(&probe, &fast_policy(), &cancel).await, Verdict::Ready);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_after_thirty_invocations() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let probe = FnProbe::new(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }
        });

        let cancel = CancellationToken::new();
        let verdict = verify(&probe, &fast_policy(), &cancel).await;

        assert_eq!(verdict, Verdict::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let probe = FnProbe::new(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }
        });

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let policy = fast_policy();

        let handle = tokio::spawn(async move { verify(&probe, &policy, &token).await });
        // Let the first poll land, then cancel during its interval sleep.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), Verdict::Canceled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_round_policy_skips_outer_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let probe = FnProbe::new(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }
        });

        let policy = ProbePolicy {
            outer_attempts: 1,
            inner_polls: 3,
            inner_interval: Duration::from_millis(10),
            outer_backoff: Duration::from_secs(600),
        };
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();

        assert_eq!(verify(&probe, &policy, &cancel).await, Verdict::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two inner sleeps only; the outer backoff never runs.
        assert_eq!(started.elapsed(), Duration::from_millis(20));
    }
}
