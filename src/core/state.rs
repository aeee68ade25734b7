//! Service lifecycle states and the per-instance runtime record.
//!
//! State machine (driven by the actor):
//!
//! ```text
//! Pending ──start──► Starting ──probe ok / no probe──► Running
//!   Starting ──probe exhausted──► Failed
//!   Running ──exit, policy says restart──► Degraded ──backoff──► Starting
//!   Running ──exit, policy says stop──► Stopped
//!   any transient ──shutdown──► Stopping ──process gone──► Stopped
//!   attempts exhausted ──► Failed
//! ```
//!
//! `Stopped` and `Failed` are terminal; everything else is transient and
//! drives further action.

use std::sync::Arc;

use serde::Serialize;

use crate::registry::ServiceDescriptor;

/// Lifecycle state of one service instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    /// Descriptor accepted, nothing spawned yet.
    Pending,
    /// Process spawned (or spawning), readiness not yet confirmed.
    Starting,
    /// Process alive and, if a probe is configured, confirmed ready.
    Running,
    /// Process exited unexpectedly; a restart is pending (backoff window).
    Degraded,
    /// Shutdown in progress: termination signal sent, waiting for exit.
    Stopping,
    /// Terminal: readiness exhausted or restart attempts exhausted.
    Failed,
    /// Terminal: exited and the policy schedules no further starts.
    Stopped,
}

impl ServiceState {
    /// True for `Stopped` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Stopped | ServiceState::Failed)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceState::Pending => "pending",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Degraded => "degraded",
            ServiceState::Stopping => "stopping",
            ServiceState::Failed => "failed",
            ServiceState::Stopped => "stopped",
        }
    }
}

/// Mutable runtime record for one supervised service.
///
/// Owned exclusively by the service's actor; the process handle itself
/// never leaves the actor's attempt loop.
pub struct ServiceInstance {
    /// The immutable descriptor this instance runs.
    pub descriptor: Arc<ServiceDescriptor>,
    /// Current lifecycle state.
    pub state: ServiceState,
    /// Start attempts in the current failure series (1-based once
    /// anything has been spawned; cleared when a probe confirms
    /// readiness).
    pub attempt: u32,
    /// Last error recorded on this instance, if any.
    pub last_error: Option<String>,
}

impl ServiceInstance {
    /// Creates a fresh instance in `Pending`.
    pub fn new(descriptor: Arc<ServiceDescriptor>) -> Self {
        Self {
            descriptor,
            state: ServiceState::Pending,
            attempt: 0,
            last_error: None,
        }
    }

    /// Convenience accessor for the service name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}
