//! Error types used by the servisor runtime.
//!
//! Errors are split by origin:
//!
//! - [`ConfigError`] — bad or missing configuration; fatal at startup,
//!   nothing is spawned.
//! - [`RegistryError`] — descriptor registration problems.
//! - [`ServiceError`] — failures of a single supervised service; contained
//!   to that instance and handled by its restart policy.
//! - [`StorageError`] — event journal write failure; process-fatal, since
//!   losing the lifecycle record is unsafe.
//! - [`RuntimeError`] — errors surfaced by the orchestration runtime as a
//!   whole (the only type `Supervisor::run` returns).
//!
//! All types provide `as_label()` for stable snake_case identifiers in
//! logs and metrics.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while loading or interpreting configuration.
///
/// Configuration errors are fatal at startup: the process must exit with
/// code 1 before any service is spawned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A key required by an enabled service is absent from the snapshot.
    #[error("missing required configuration key: {key}")]
    MissingKey {
        /// The absent key.
        key: String,
    },

    /// A key is present but its value cannot be parsed as the expected type.
    #[error("invalid value for {key}: {value:?} (expected {expected})")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The raw value found in the snapshot.
        value: String,
        /// Human description of the expected shape (e.g. "true/false").
        expected: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingKey { .. } => "config_missing_key",
            ConfigError::InvalidValue { .. } => "config_invalid_value",
        }
    }
}

/// Errors produced by the service descriptor registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A descriptor with this name is already registered.
    ///
    /// The registry keeps the first registration; the duplicate is
    /// rejected.
    #[error("duplicate service name: {name}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateName { .. } => "registry_duplicate_name",
        }
    }
}

/// Failure to persist an event to the journal.
///
/// Treated as fatal to the whole supervisor: continuing without an
/// observable lifecycle record is unacceptable.
#[derive(Error, Debug)]
#[error("event journal write failed: {0}")]
pub struct StorageError(#[from] pub std::io::Error);

/// Errors produced by a single supervised service.
///
/// These never crash the orchestrator; they are recorded on the instance
/// and fed into its restart policy.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The command could not be spawned (binary missing, permissions).
    ///
    /// Handled identically to an immediate non-zero exit: the restart
    /// policy decides what happens next.
    #[error("spawn failed: {error}")]
    Spawn {
        /// The underlying OS error message.
        error: String,
    },

    /// The process exited with a non-zero status.
    #[error("exited with code {code}")]
    Exit {
        /// Exit code; `-1` when terminated by a signal.
        code: i32,
    },

    /// Readiness verification consumed all outer attempts and inner polls.
    #[error("readiness probe exhausted after {attempts} probe invocations")]
    ProbeExhausted {
        /// Total number of probe invocations issued.
        attempts: u32,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Spawn { .. } => "service_spawn_failed",
            ServiceError::Exit { .. } => "service_exit",
            ServiceError::ProbeExhausted { .. } => "service_probe_exhausted",
        }
    }
}

/// Errors surfaced by the orchestration runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration was missing or invalid; nothing was spawned.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Descriptor registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The event journal failed; observability loss forces termination.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A service marked mandatory reached the `Failed` state.
    #[error("mandatory service {service} failed: {detail}")]
    MandatoryServiceFailed {
        /// Name of the failed service.
        service: String,
        /// Terminal error recorded on the instance.
        detail: String,
    },

    /// One or more services did not exit within the shutdown grace.
    ///
    /// Covers both a service that had to be force-killed after ignoring
    /// SIGTERM and an actor task that never settled at all.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of services that did not stop gracefully.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::Registry(_) => "runtime_registry",
            RuntimeError::Storage(_) => "runtime_storage",
            RuntimeError::MandatoryServiceFailed { .. } => "runtime_mandatory_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Process exit code this error maps to at the binary boundary.
    ///
    /// Every runtime error is fatal; the distinction exists so callers can
    /// keep the contract in one place.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
