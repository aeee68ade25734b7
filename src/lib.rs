//! # servisor
//!
//! **Servisor** is a multi-service child-process supervisor for Rust.
//!
//! It runs a declared set of OS services inside one process: starting
//! them in priority order, verifying readiness with pluggable probes,
//! restarting them under configurable policies, and tearing them down
//! gracefully in reverse order on shutdown. The crate is both a library
//! for embedders and a standalone binary driven by a JSON manifest.
//!
//! ## Architecture
//! ### Overview
//! ```text
//! ┌───────────────────┐  ┌───────────────────┐  ┌───────────────────┐
//! │ ServiceDescriptor │  │ ServiceDescriptor │  │ ServiceDescriptor │
//! │  (mesh, prio 10)  │  │ (tunnel, prio 20) │  │  (dns, prio 30)   │
//! └─────────┬─────────┘  └─────────┬─────────┘  └─────────┬─────────┘
//!           └──────────────────────┼──────────────────────┘
//!                                  ▼
//!                     Registry::resolve_enabled(ConfigSnapshot)
//!                                  │   (enablement computed once,
//!                                  ▼    stable-sorted by priority)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - launches one ServiceActor per service, ascending priority      │
//! │  - EventLog (authoritative, append-only, optional JSON journal)   │
//! │  - Bus (lossy broadcast) ──► SubscriberSet (per-sub queues)       │
//! │  - OS signals ──► shutdown token ──► reverse-priority stop        │
//! └─────────┬─────────────────────┬─────────────────────┬─────────────┘
//!           ▼                     ▼                     ▼
//!   ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//!   │ ServiceActor  │     │ ServiceActor  │     │ ServiceActor  │
//!   │ spawn ► probe │     │ spawn ► probe │     │ spawn ► probe │
//!   │ ► run ► exit  │     │ ► run ► exit  │     │ ► run ► exit  │
//!   │ ► backoff ──┐ │     │               │     │               │
//!   │ ▲───────────┘ │     │               │     │               │
//!   └───────────────┘     └───────────────┘     └───────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Pending ──► Starting ──► Running ──► Stopping ──► Stopped
//!                │  ▲          │
//!                │  │          └─ unexpected exit ─► Degraded (backoff)
//!                │  └─────────────────────────────────────┘
//!                └─ probe exhausted / attempts capped ──► Failed
//! ```
//!
//! A `Failed` *mandatory* service stops the whole supervisor with a
//! non-zero exit; optional services fail alone.
//!
//! ## Features
//! | Area               | Description                                                   | Key types / traits                          |
//! |--------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Descriptors**    | Declare services: command, priority, policies, gating.        | [`ServiceDescriptor`], [`Registry`]         |
//! | **Configuration**  | One frozen snapshot of the environment; typed getters.        | [`ConfigSnapshot`], [`SupervisorConfig`]    |
//! | **Readiness**      | Two-tier probe loop gating `Starting ─► Running`.             | [`Probe`], [`CommandProbe`], [`ProbePolicy`]|
//! | **Policies**       | Restart and backoff strategies per service.                   | [`RestartPolicy`], [`BackoffPolicy`]        |
//! | **Supervision**    | Ordered start/stop, grace-bounded termination.                | [`Supervisor`]                              |
//! | **Events**         | Authoritative log with filtered queries; lossy broadcast.     | [`EventLog`], [`EventFilter`], [`Bus`]      |
//! | **Subscriber API** | Hook into lifecycle events (logging, metrics, alerting).      | [`Subscribe`], [`LogWriter`]                |
//! | **Manifest**       | JSON declaration consumed by the binary; emitted artifact.    | [`Manifest`], [`ManifestEntry`]             |
//! | **Errors**         | Typed errors per origin, each mapped to an exit contract.     | [`RuntimeError`], [`ServiceError`]          |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use servisor::{
//!     CommandSpec, ConfigSnapshot, LogWriter, Registry, RestartPolicy,
//!     ServiceDescriptor, Subscribe, Supervisor, SupervisorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = Registry::new();
//!     registry.register(
//!         ServiceDescriptor::builder(
//!             "mesh",
//!             CommandSpec::with_args("/usr/sbin/mesh-agent", ["--state", "/var/lib/mesh"]),
//!         )
//!         .priority(10)
//!         .restart(RestartPolicy::Always)
//!         .mandatory(true)
//!         .enable_key("ENABLE_MESH")
//!         .build(),
//!     )?;
//!
//!     let config = ConfigSnapshot::from_env();
//!     let services = registry.resolve_enabled(&config)?;
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let supervisor = Supervisor::new(SupervisorConfig::from_snapshot(&config)?, subs);
//!     supervisor.run(services).await?;
//!     Ok(())
//! }
//! ```

mod core;
mod errors;
mod events;
mod manifest;
mod policies;
mod probes;
mod registry;
mod snapshot;
mod subscribers;

// ---- Public re-exports ----

pub use core::{ServiceInstance, ServiceState, Supervisor, SupervisorConfig};
pub use errors::{ConfigError, RegistryError, RuntimeError, ServiceError, StorageError};
pub use events::{Bus, Event, EventFilter, EventKind, EventLog};
pub use manifest::{BackoffEntry, Manifest, ManifestEntry, ProbeEntry};
pub use policies::{BackoffPolicy, JitterPolicy, ProbePolicy, RestartPolicy};
pub use probes::{verify, CommandProbe, FnProbe, Probe, ProbeRef, Verdict};
pub use registry::{
    CommandSpec, ReadinessSpec, Registry, ServiceDescriptor, ServiceDescriptorBuilder,
};
pub use snapshot::ConfigSnapshot;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
