//! Runtime core: orchestration and lifecycle.
//!
//! Internal modules:
//! - [`supervisor`]: launches actors in priority order, watches for
//!   shutdown and fatal conditions, stops services in reverse order;
//! - [`actor`]: supervises a single child process through its state
//!   machine (spawn, readiness, restart policy, backoff, termination);
//! - [`state`]: lifecycle states and the per-instance record;
//! - [`shutdown`]: cross-platform OS signal handling;
//! - [`config`]: runtime settings.

mod actor;
mod config;
mod shutdown;
mod state;
mod supervisor;

pub use config::SupervisorConfig;
pub use state::{ServiceInstance, ServiceState};
pub use supervisor::Supervisor;
