//! Runtime events emitted by the supervisor and service actors.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the
//! metadata: which service, which state transition, which attempt, how
//! long the scheduled delay is.
//!
//! ## Ordering
//! Every event gets a globally unique, monotonically increasing sequence
//! number (`seq`). Per service, append order in the log matches
//! transition order; across independent services events interleave as
//! real concurrency dictates, and `seq` restores a usable total order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::core::ServiceState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A service instance moved between lifecycle states.
    ///
    /// Sets: `service`, `from`, `to`; `attempt` when a process start is
    /// involved; `detail` for errors and exit codes.
    StateChanged,

    /// A restart was scheduled after an unexpected exit.
    ///
    /// Sets: `service`, `attempt` (the attempt that just failed),
    /// `delay_ms`, `detail` (the failure).
    BackoffScheduled,

    /// Shutdown requested (OS signal or explicit cancellation).
    ShutdownRequested,

    /// Every service stopped within the configured grace period.
    AllStoppedWithinGrace,

    /// Grace period exceeded; `detail` lists the stuck services.
    GraceExceeded,
}

/// Append-only record of one supervisor occurrence.
///
/// Never mutated after construction; shared as `Arc<Event>` between the
/// log and bus subscribers.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the service, if applicable.
    pub service: Option<Arc<str>>,
    /// State left, for `StateChanged`.
    pub from: Option<ServiceState>,
    /// State entered, for `StateChanged`.
    pub to: Option<ServiceState>,
    /// Start attempt number (1-based), when a process start is involved.
    pub attempt: Option<u32>,
    /// Scheduled delay in milliseconds, for `BackoffScheduled`.
    pub delay_ms: Option<u64>,
    /// Human-readable detail (error message, exit code, stuck list).
    pub detail: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event with the current timestamp and next sequence
    /// number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            from: None,
            to: None,
            attempt: None,
            delay_ms: None,
            detail: None,
        }
    }

    /// Attaches the service name.
    #[inline]
    pub fn with_service(mut self, name: impl Into<Arc<str>>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches a state transition.
    #[inline]
    pub fn with_transition(mut self, from: ServiceState, to: ServiceState) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable detail.
    #[inline]
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
