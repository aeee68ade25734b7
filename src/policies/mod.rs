//! Restart, backoff, and readiness-probe policies.
//!
//! This module groups the knobs that control **if/when** a service is
//! relaunched and **how long** the supervisor waits between attempts and
//! probe polls.
//!
//! ## Contents
//! - [`RestartPolicy`] — when to restart (never / on-failure / always)
//! - [`BackoffPolicy`] — how restart delays grow (first / factor / max + jitter)
//! - [`JitterPolicy`] — randomization to avoid synchronized restarts
//! - [`ProbePolicy`] — two-tier readiness verification schedule
//!
//! ## Defaults
//! - `RestartPolicy::OnFailure`
//! - `BackoffPolicy::default()` → first=2s, factor=2.0, max=60s, no jitter
//! - `ProbePolicy::default()` → 3 outer attempts × 10 inner polls,
//!   2s poll interval, 5s inter-attempt backoff

mod backoff;
mod jitter;
mod probe;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use probe::ProbePolicy;
pub use restart::RestartPolicy;
