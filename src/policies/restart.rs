//! Restart policies for supervised services.
//!
//! [`RestartPolicy`] decides what happens when a service's process exits
//! outside of shutdown:
//!
//! - [`RestartPolicy::Never`] — the service runs once; any exit is final.
//! - [`RestartPolicy::OnFailure`] — restarted only when the exit code is
//!   non-zero (default).
//! - [`RestartPolicy::Always`] — restarted unconditionally, success or not.
//!
//! Restart delays are governed separately by
//! [`BackoffPolicy`](crate::BackoffPolicy); an optional attempt cap lives
//! on the service descriptor.

use serde::{Deserialize, Serialize};

/// Policy controlling whether a service is relaunched after its process
/// exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Never restart: one run, then the instance settles in `Stopped`.
    Never,
    /// Restart only when the process exits with a non-zero code (default).
    #[default]
    OnFailure,
    /// Restart unconditionally after every exit.
    Always,
}

impl RestartPolicy {
    /// Returns true if an exit with the given success flag warrants a
    /// restart under this policy.
    pub fn should_restart(&self, exited_cleanly: bool) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => !exited_cleanly,
            RestartPolicy::Always => true,
        }
    }
}
