//! Service descriptor registry.
//!
//! [`ServiceDescriptor`] is the immutable, declarative definition of one
//! manageable child service: what to run, when it counts as enabled,
//! how to verify readiness, and what to do when it exits. Descriptors
//! are built once at startup via [`ServiceDescriptor::builder`] and
//! shared as `Arc<ServiceDescriptor>` for the rest of the process
//! lifetime.
//!
//! [`Registry`] holds them in registration order:
//! - [`Registry::register`] rejects duplicate names (the first
//!   registration wins);
//! - [`Registry::resolve_enabled`] computes enablement **once** from a
//!   [`ConfigSnapshot`] and returns the enabled descriptors
//!   stable-sorted by ascending priority, registration order breaking
//!   ties.

use std::sync::Arc;

use crate::errors::{ConfigError, RegistryError};
use crate::policies::{BackoffPolicy, ProbePolicy, RestartPolicy};
use crate::probes::{CommandProbe, ProbeRef};
use crate::snapshot::ConfigSnapshot;

/// Executable invocation: program path plus arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name (resolved via `PATH`).
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Creates a command with arguments.
    pub fn with_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Readiness verification attached to a descriptor: the probe itself
/// plus its two-tier schedule.
#[derive(Clone)]
pub struct ReadinessSpec {
    /// The pluggable check.
    pub probe: ProbeRef,
    /// Polling schedule.
    pub policy: ProbePolicy,
    /// Kept when the probe is command-backed, so the registry can
    /// re-emit the declaration in the manifest.
    command: Option<CommandProbe>,
}

impl std::fmt::Debug for ReadinessSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessSpec")
            .field("probe", &"<dyn Probe>")
            .field("policy", &self.policy)
            .field("command", &self.command)
            .finish()
    }
}

impl ReadinessSpec {
    /// The originating command declaration, when the probe is a
    /// [`CommandProbe`]. Closure-backed probes have none.
    pub fn command_probe(&self) -> Option<&CommandProbe> {
        self.command.as_ref()
    }
}

/// Immutable declaration of one manageable child service.
///
/// Created at startup, never re-evaluated during the process lifetime.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    name: String,
    command: CommandSpec,
    priority: i32,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    readiness: Option<ReadinessSpec>,
    mandatory: bool,
    autostart: bool,
    enable_key: Option<String>,
    required_keys: Vec<String>,
    max_attempts: Option<u32>,
}

impl ServiceDescriptor {
    /// Starts a builder for a service running `command`.
    pub fn builder(name: impl Into<String>, command: CommandSpec) -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder {
            name: name.into(),
            command,
            priority: 0,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            readiness: None,
            mandatory: false,
            autostart: true,
            enable_key: None,
            required_keys: Vec::new(),
            max_attempts: None,
        }
    }

    /// Unique service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The executable invocation.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Start/stop ordering priority; lower starts first, stops last.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Restart policy applied on process exit.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Backoff schedule between restarts.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Readiness verification, if configured.
    pub fn readiness(&self) -> Option<&ReadinessSpec> {
        self.readiness.as_ref()
    }

    /// True if this service reaching `Failed` must stop the supervisor.
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Restart attempt cap; `None` = unbounded.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Snapshot key gating enablement, if any.
    pub fn enable_key(&self) -> Option<&str> {
        self.enable_key.as_deref()
    }

    /// Snapshot keys that must be present when the service is enabled.
    pub fn required_keys(&self) -> &[String] {
        &self.required_keys
    }

    /// Computes enablement from the snapshot.
    ///
    /// Disabled when `autostart` is false; otherwise gated by
    /// `enable_key` (absent key → disabled, non-boolean value → error).
    pub fn is_enabled(&self, config: &ConfigSnapshot) -> Result<bool, ConfigError> {
        if !self.autostart {
            return Ok(false);
        }
        match &self.enable_key {
            None => Ok(true),
            Some(key) => config.bool(key, false),
        }
    }
}

/// Builder for [`ServiceDescriptor`].
pub struct ServiceDescriptorBuilder {
    name: String,
    command: CommandSpec,
    priority: i32,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    readiness: Option<ReadinessSpec>,
    mandatory: bool,
    autostart: bool,
    enable_key: Option<String>,
    required_keys: Vec<String>,
    max_attempts: Option<u32>,
}

impl ServiceDescriptorBuilder {
    /// Sets the start ordering priority (default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the restart policy (default `OnFailure`).
    pub fn restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Sets the restart backoff (default 2s doubling, capped at 60s).
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Attaches a readiness probe with its schedule.
    ///
    /// An arbitrary probe cannot be rendered back into a manifest
    /// declaration; use [`Self::readiness_command`] when the probe is a
    /// status command, so the declaration survives emission.
    pub fn readiness(mut self, probe: ProbeRef, policy: ProbePolicy) -> Self {
        self.readiness = Some(ReadinessSpec {
            probe,
            policy,
            command: None,
        });
        self
    }

    /// Attaches a command probe with its schedule, keeping the
    /// declaration so the registry can re-emit it.
    pub fn readiness_command(mut self, probe: CommandProbe, policy: ProbePolicy) -> Self {
        self.readiness = Some(ReadinessSpec {
            probe: Arc::new(probe.clone()),
            policy,
            command: Some(probe),
        });
        self
    }

    /// Marks the service mandatory: its `Failed` state stops the
    /// supervisor with a non-zero exit.
    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Disables the service regardless of configuration (default true).
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Gates enablement behind a boolean snapshot key.
    pub fn enable_key(mut self, key: impl Into<String>) -> Self {
        self.enable_key = Some(key.into());
        self
    }

    /// Requires a snapshot key to be present when the service is
    /// enabled; resolution fails fast naming the key otherwise.
    pub fn require_key(mut self, key: impl Into<String>) -> Self {
        self.required_keys.push(key.into());
        self
    }

    /// Caps restart attempts (default unbounded).
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Finalizes the descriptor.
    pub fn build(self) -> Arc<ServiceDescriptor> {
        Arc::new(ServiceDescriptor {
            name: self.name,
            command: self.command,
            priority: self.priority,
            restart: self.restart,
            backoff: self.backoff,
            readiness: self.readiness,
            mandatory: self.mandatory,
            autostart: self.autostart,
            enable_key: self.enable_key,
            required_keys: self.required_keys,
            max_attempts: self.max_attempts,
        })
    }
}

/// Ordered collection of service descriptors.
///
/// Read-only after startup; registration order is preserved and used to
/// break priority ties.
#[derive(Default)]
pub struct Registry {
    descriptors: Vec<Arc<ServiceDescriptor>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// Fails with [`RegistryError::DuplicateName`] if the name is taken;
    /// the first registration is retained.
    pub fn register(&mut self, descriptor: Arc<ServiceDescriptor>) -> Result<(), RegistryError> {
        if self.descriptors.iter().any(|d| d.name() == descriptor.name()) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// All registered descriptors in registration order.
    pub fn descriptors(&self) -> &[Arc<ServiceDescriptor>] {
        &self.descriptors
    }

    /// Looks up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    /// Resolves the enabled descriptors for this snapshot, sorted by
    /// ascending priority (stable on ties).
    ///
    /// Enablement is computed exactly once here; for every enabled
    /// service all `required_keys` must be present in the snapshot or
    /// resolution fails fast with [`ConfigError::MissingKey`] naming the
    /// first absent key.
    pub fn resolve_enabled(
        &self,
        config: &ConfigSnapshot,
    ) -> Result<Vec<Arc<ServiceDescriptor>>, ConfigError> {
        let mut enabled = Vec::new();
        for descriptor in &self.descriptors {
            if !descriptor.is_enabled(config)? {
                continue;
            }
            for key in descriptor.required_keys() {
                if !config.contains(key) {
                    return Err(ConfigError::MissingKey { key: key.clone() });
                }
            }
            enabled.push(Arc::clone(descriptor));
        }
        // Vec::sort_by_key is stable: ties keep registration order.
        enabled.sort_by_key(|d| d.priority());
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, priority: i32) -> Arc<ServiceDescriptor> {
        ServiceDescriptor::builder(name, CommandSpec::new("true"))
            .priority(priority)
            .build()
    }

    #[test]
    fn duplicate_name_keeps_first_registration() {
        let mut registry = Registry::new();
        let first = ServiceDescriptor::builder("tunnel", CommandSpec::new("relay-client"))
            .priority(10)
            .build();
        let second = ServiceDescriptor::builder("tunnel", CommandSpec::new("other"))
            .priority(20)
            .build();

        registry.register(first).unwrap();
        let err = registry.register(second).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { ref name } if name == "tunnel"));

        assert_eq!(registry.descriptors().len(), 1);
        let kept = registry.get("tunnel").unwrap();
        assert_eq!(kept.command().program, "relay-client");
        assert_eq!(kept.priority(), 10);
    }

    #[test]
    fn resolve_sorts_by_priority_ascending() {
        let mut registry = Registry::new();
        registry.register(descriptor("c", 30)).unwrap();
        registry.register(descriptor("a", 10)).unwrap();
        registry.register(descriptor("b", 20)).unwrap();

        let config = ConfigSnapshot::default();
        let order: Vec<String> = registry
            .resolve_enabled(&config)
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_priority_preserves_registration_order() {
        let mut registry = Registry::new();
        registry.register(descriptor("x", 5)).unwrap();
        registry.register(descriptor("y", 5)).unwrap();

        let config = ConfigSnapshot::default();
        let resolved = registry.resolve_enabled(&config).unwrap();
        assert_eq!(resolved[0].name(), "x");
        assert_eq!(resolved[1].name(), "y");

        // Swapping registration order swaps the output order.
        let mut swapped = Registry::new();
        swapped.register(descriptor("y", 5)).unwrap();
        swapped.register(descriptor("x", 5)).unwrap();
        let resolved = swapped.resolve_enabled(&config).unwrap();
        assert_eq!(resolved[0].name(), "y");
        assert_eq!(resolved[1].name(), "x");
    }

    #[test]
    fn enable_key_gates_enablement() {
        let mut registry = Registry::new();
        let gated = ServiceDescriptor::builder("mesh", CommandSpec::new("mesh-agent"))
            .enable_key("ENABLE_MESH")
            .build();
        registry.register(gated).unwrap();

        let off = ConfigSnapshot::default();
        assert!(registry.resolve_enabled(&off).unwrap().is_empty());

        let on = ConfigSnapshot::from_iter([("ENABLE_MESH", "true")]);
        assert_eq!(registry.resolve_enabled(&on).unwrap().len(), 1);

        let bad = ConfigSnapshot::from_iter([("ENABLE_MESH", "1")]);
        assert!(matches!(
            registry.resolve_enabled(&bad),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_required_key_names_the_key() {
        let mut registry = Registry::new();
        let needs_token = ServiceDescriptor::builder("mesh", CommandSpec::new("mesh-agent"))
            .enable_key("ENABLE_MESH")
            .require_key("MESH_AUTH_KEY")
            .build();
        registry.register(needs_token).unwrap();

        let on = ConfigSnapshot::from_iter([("ENABLE_MESH", "true")]);
        match registry.resolve_enabled(&on) {
            Err(ConfigError::MissingKey { key }) => assert_eq!(key, "MESH_AUTH_KEY"),
            other => panic!("expected MissingKey, got {other:?}"),
        }

        // Disabled services never have their required keys checked.
        let off = ConfigSnapshot::default();
        assert!(registry.resolve_enabled(&off).unwrap().is_empty());
    }

    #[test]
    fn autostart_false_is_never_enabled() {
        let mut registry = Registry::new();
        let parked = ServiceDescriptor::builder("parked", CommandSpec::new("true"))
            .autostart(false)
            .build();
        registry.register(parked).unwrap();
        let config = ConfigSnapshot::default();
        assert!(registry.resolve_enabled(&config).unwrap().is_empty());
    }
}
