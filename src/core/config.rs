//! Global runtime configuration.
//!
//! [`SupervisorConfig`] centralizes the settings that apply to the whole
//! supervisor rather than to a single service. Per-service knobs
//! (restart, backoff, probes) live on the descriptors.

use std::time::Duration;

use crate::errors::ConfigError;
use crate::snapshot::ConfigSnapshot;

/// Snapshot key overriding the shutdown grace, in seconds.
pub const GRACE_SECS_KEY: &str = "SERVISOR_GRACE_SECS";
/// Snapshot key overriding the event bus capacity.
pub const BUS_CAPACITY_KEY: &str = "SERVISOR_BUS_CAPACITY";

/// Settings for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: per-service wait between the graceful termination signal
///   and forced kill during shutdown
/// - `bus_capacity`: ring-buffer size of the broadcast bus (clamped to
///   1 by the bus itself)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum wait for a service to exit after SIGTERM before SIGKILL.
    pub grace: Duration,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl Default for SupervisorConfig {
    /// `grace = 30s`, `bus_capacity = 1024`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}

impl SupervisorConfig {
    /// Builds a config from the snapshot, applying overrides where the
    /// corresponding keys are present.
    pub fn from_snapshot(config: &ConfigSnapshot) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            grace: Duration::from_secs(config.u64(GRACE_SECS_KEY, defaults.grace.as_secs())?),
            bus_capacity: config.u64(BUS_CAPACITY_KEY, defaults.bus_capacity as u64)? as usize,
        })
    }
}
