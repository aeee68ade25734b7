//! Declarative service manifest — the serialization contract.
//!
//! The manifest is the typed document the registry can emit or consume
//! for interoperability with existing process-supervision tooling: a
//! flat list of services with their commands, autostart/autorestart
//! flags, and priorities, plus the probe and backoff settings this
//! supervisor adds. It replaces conditional string concatenation of a
//! supervisor config file with a structured document serialized through
//! serde.
//!
//! ```json
//! {
//!   "services": [
//!     {
//!       "name": "mesh",
//!       "command": "/usr/sbin/mesh-agent",
//!       "args": ["--state", "/var/lib/mesh"],
//!       "autostart": true,
//!       "autorestart": "on-failure",
//!       "priority": 10,
//!       "mandatory": true,
//!       "enable_key": "ENABLE_MESH",
//!       "require": ["MESH_AUTH_KEY"],
//!       "probe": { "command": "mesh", "args": ["status"], "token": "authenticated" }
//!     }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, RegistryError};
use crate::policies::{BackoffPolicy, JitterPolicy, ProbePolicy, RestartPolicy};
use crate::probes::CommandProbe;
use crate::registry::{CommandSpec, Registry, ServiceDescriptor};
use crate::snapshot::ConfigSnapshot;

/// Top-level manifest document.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Declared services, in declaration order.
    pub services: Vec<ManifestEntry>,
}

/// One service declaration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    /// Unique service name.
    pub name: String,
    /// Program path or name.
    pub command: String,
    /// Arguments passed verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Whether the service participates in startup at all.
    #[serde(default = "default_true")]
    pub autostart: bool,
    /// Restart policy.
    #[serde(default)]
    pub autorestart: RestartPolicy,
    /// Start ordering priority; lower starts first, stops last.
    #[serde(default)]
    pub priority: i32,
    /// Whether failure of this service stops the supervisor.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mandatory: bool,
    /// Boolean snapshot key gating enablement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_key: Option<String>,
    /// Snapshot keys that must be present when enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<String>,
    /// Restart attempt cap; absent = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Restart backoff overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffEntry>,
    /// Readiness probe declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeEntry>,
}

/// Restart backoff settings as carried in the manifest.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BackoffEntry {
    /// Initial delay in milliseconds.
    #[serde(default = "default_backoff_first_ms")]
    pub first_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
    /// Multiplicative growth factor.
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
}

/// Command probe declaration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProbeEntry {
    /// Status command to run.
    pub command: String,
    /// Arguments for the status command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Success token expected in stdout.
    pub token: String,
    /// Full verification rounds.
    #[serde(default = "default_outer_attempts")]
    pub outer_attempts: u32,
    /// Polls per round.
    #[serde(default = "default_inner_polls")]
    pub inner_polls: u32,
    /// Delay between polls, milliseconds.
    #[serde(default = "default_inner_interval_ms")]
    pub inner_interval_ms: u64,
    /// Delay between rounds, milliseconds.
    #[serde(default = "default_outer_backoff_ms")]
    pub outer_backoff_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_backoff_first_ms() -> u64 {
    2_000
}
fn default_backoff_max_ms() -> u64 {
    60_000
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_outer_attempts() -> u32 {
    3
}
fn default_inner_polls() -> u32 {
    10
}
fn default_inner_interval_ms() -> u64 {
    2_000
}
fn default_outer_backoff_ms() -> u64 {
    5_000
}

impl Manifest {
    /// Parses a manifest from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidValue {
            key: "manifest".to_string(),
            value: e.to_string(),
            expected: "valid manifest JSON",
        })
    }

    /// Loads a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            key: "manifest".to_string(),
            value: format!("{}: {e}", path.display()),
            expected: "readable manifest file",
        })?;
        Self::from_json(&raw)
    }

    /// Serializes the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        // A struct of plain fields cannot fail to serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl ProbeEntry {
    fn policy(&self) -> ProbePolicy {
        ProbePolicy {
            outer_attempts: self.outer_attempts,
            inner_polls: self.inner_polls,
            inner_interval: Duration::from_millis(self.inner_interval_ms),
            outer_backoff: Duration::from_millis(self.outer_backoff_ms),
        }
    }
}

impl BackoffEntry {
    fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(self.first_ms),
            max: Duration::from_millis(self.max_ms),
            factor: self.factor,
            jitter: JitterPolicy::None,
        }
    }
}

impl Registry {
    /// Builds a registry from a manifest, preserving declaration order.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        for entry in &manifest.services {
            registry.register(entry.to_descriptor())?;
        }
        Ok(registry)
    }

    /// Emits the declarative artifact for this snapshot: the enabled
    /// services in start order, with their effective settings.
    pub fn to_manifest(&self, config: &ConfigSnapshot) -> Result<Manifest, ConfigError> {
        let services = self
            .resolve_enabled(config)?
            .iter()
            .map(|d| ManifestEntry::from_descriptor(d))
            .collect();
        Ok(Manifest { services })
    }
}

impl ManifestEntry {
    /// Converts this declaration into a descriptor.
    pub fn to_descriptor(&self) -> Arc<ServiceDescriptor> {
        let command = CommandSpec::with_args(self.command.clone(), self.args.clone());
        let mut builder = ServiceDescriptor::builder(self.name.clone(), command)
            .priority(self.priority)
            .restart(self.autorestart)
            .mandatory(self.mandatory)
            .autostart(self.autostart);

        if let Some(backoff) = &self.backoff {
            builder = builder.backoff(backoff.policy());
        }
        if let Some(key) = &self.enable_key {
            builder = builder.enable_key(key.clone());
        }
        for key in &self.require {
            builder = builder.require_key(key.clone());
        }
        if let Some(max) = self.max_attempts {
            builder = builder.max_attempts(max);
        }
        if let Some(probe) = &self.probe {
            let command_probe = CommandProbe::new(
                probe.command.clone(),
                probe.args.clone(),
                probe.token.clone(),
            );
            builder = builder.readiness_command(command_probe, probe.policy());
        }
        builder.build()
    }

    /// Renders a descriptor back into a declaration.
    ///
    /// Command-backed probes keep their declaration on the descriptor
    /// and round-trip intact. A closure-backed probe cannot be turned
    /// back into a command line and is omitted from the emitted entry.
    pub fn from_descriptor(descriptor: &ServiceDescriptor) -> Self {
        let backoff = descriptor.backoff();
        let probe = descriptor.readiness().and_then(|readiness| {
            readiness.command_probe().map(|cp| ProbeEntry {
                command: cp.program().to_string(),
                args: cp.args().to_vec(),
                token: cp.token().to_string(),
                outer_attempts: readiness.policy.outer_attempts,
                inner_polls: readiness.policy.inner_polls,
                inner_interval_ms: readiness.policy.inner_interval.as_millis() as u64,
                outer_backoff_ms: readiness.policy.outer_backoff.as_millis() as u64,
            })
        });
        Self {
            name: descriptor.name().to_string(),
            command: descriptor.command().program.clone(),
            args: descriptor.command().args.clone(),
            autostart: true,
            autorestart: descriptor.restart(),
            priority: descriptor.priority(),
            mandatory: descriptor.mandatory(),
            enable_key: descriptor.enable_key().map(str::to_string),
            require: descriptor.required_keys().to_vec(),
            max_attempts: descriptor.max_attempts(),
            backoff: Some(BackoffEntry {
                first_ms: backoff.first.as_millis() as u64,
                max_ms: backoff.max.as_millis() as u64,
                factor: backoff.factor,
            }),
            probe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "services": [
            {
                "name": "mesh",
                "command": "/usr/sbin/mesh-agent",
                "args": ["--state", "/var/lib/mesh"],
                "autorestart": "always",
                "priority": 10,
                "mandatory": true,
                "enable_key": "ENABLE_MESH",
                "require": ["MESH_AUTH_KEY"],
                "probe": {
                    "command": "mesh",
                    "args": ["status"],
                    "token": "authenticated"
                }
            },
            {
                "name": "tunnel",
                "command": "tunnel-client",
                "args": ["run"],
                "priority": 20,
                "enable_key": "ENABLE_TUNNEL",
                "require": ["TUNNEL_TOKEN"]
            }
        ]
    }"#;

    #[test]
    fn parses_declarations_with_defaults() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.services.len(), 2);

        let mesh = &manifest.services[0];
        assert!(mesh.autostart);
        assert_eq!(mesh.autorestart, RestartPolicy::Always);
        let probe = mesh.probe.as_ref().unwrap();
        assert_eq!(probe.outer_attempts, 3);
        assert_eq!(probe.inner_polls, 10);
        assert_eq!(probe.inner_interval_ms, 2_000);
        assert_eq!(probe.outer_backoff_ms, 5_000);

        let tunnel = &manifest.services[1];
        assert_eq!(tunnel.autorestart, RestartPolicy::OnFailure);
        assert!(tunnel.probe.is_none());
    }

    #[test]
    fn registry_from_manifest_builds_descriptors() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let registry = Registry::from_manifest(&manifest).unwrap();

        let mesh = registry.get("mesh").unwrap();
        assert_eq!(mesh.command().program, "/usr/sbin/mesh-agent");
        assert_eq!(mesh.priority(), 10);
        assert!(mesh.mandatory());
        assert!(mesh.readiness().is_some());
        assert_eq!(mesh.required_keys(), ["MESH_AUTH_KEY"]);

        // Enablement still flows through the snapshot.
        let config = ConfigSnapshot::from_iter([
            ("ENABLE_MESH", "true"),
            ("MESH_AUTH_KEY", "ts-key"),
        ]);
        let enabled = registry.resolve_enabled(&config).unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), "mesh");
    }

    #[test]
    fn emitted_artifact_lists_enabled_services_in_start_order() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let registry = Registry::from_manifest(&manifest).unwrap();
        let config = ConfigSnapshot::from_iter([
            ("ENABLE_MESH", "true"),
            ("MESH_AUTH_KEY", "k"),
            ("ENABLE_TUNNEL", "true"),
            ("TUNNEL_TOKEN", "t"),
        ]);

        let emitted = registry.to_manifest(&config).unwrap();
        let names: Vec<&str> = emitted.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mesh", "tunnel"]);
        assert_eq!(emitted.services[0].autorestart, RestartPolicy::Always);
        assert_eq!(emitted.services[0].priority, 10);

        // The probe declaration survives the consume/emit round trip.
        let probe = emitted.services[0].probe.as_ref().unwrap();
        assert_eq!(probe.command, "mesh");
        assert_eq!(probe.args, ["status"]);
        assert_eq!(probe.token, "authenticated");
        assert_eq!(probe.outer_attempts, 3);
        assert_eq!(probe.inner_polls, 10);
        assert_eq!(probe.inner_interval_ms, 2_000);
        assert_eq!(probe.outer_backoff_ms, 5_000);
        assert!(emitted.services[1].probe.is_none());

        // The artifact is valid JSON that parses back.
        let round = Manifest::from_json(&emitted.to_json()).unwrap();
        assert_eq!(round.services.len(), 2);
        assert_eq!(round.services[0].probe, emitted.services[0].probe);
    }

    #[test]
    fn duplicate_names_in_manifest_are_rejected() {
        let manifest = Manifest {
            services: vec![
                ManifestEntry {
                    name: "tunnel".into(),
                    command: "a".into(),
                    args: vec![],
                    autostart: true,
                    autorestart: RestartPolicy::Never,
                    priority: 0,
                    mandatory: false,
                    enable_key: None,
                    require: vec![],
                    max_attempts: None,
                    backoff: None,
                    probe: None,
                },
                ManifestEntry {
                    name: "tunnel".into(),
                    command: "b".into(),
                    args: vec![],
                    autostart: true,
                    autorestart: RestartPolicy::Never,
                    priority: 1,
                    mandatory: false,
                    enable_key: None,
                    require: vec![],
                    max_attempts: None,
                    backoff: None,
                    probe: None,
                },
            ],
        };
        assert!(matches!(
            Registry::from_manifest(&manifest),
            Err(RegistryError::DuplicateName { .. })
        ));
    }
}
