//! Binary entrypoint: manifest-driven service supervision.
//!
//! Reads the environment once, loads the service manifest, resolves the
//! enabled services, and runs the supervisor until every service settles
//! or a termination signal arrives.
//!
//! ## Environment
//! - `SERVISOR_MANIFEST` — path to the JSON service manifest (required)
//! - `SERVISOR_JOURNAL` — append events as JSON lines to this file
//! - `SERVISOR_EMIT_MANIFEST` — write the resolved (enabled, ordered)
//!   manifest to this path before starting anything
//! - `SERVISOR_GRACE_SECS`, `SERVISOR_BUS_CAPACITY` — runtime overrides
//! - `RUST_LOG` — log filter (default `info`)
//!
//! ## Exit codes
//! - `0` — every service settled and shutdown completed within grace
//! - `1` — configuration error, mandatory service failure, journal
//!   failure, or grace exceeded

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use servisor::{
    ConfigSnapshot, EventLog, LogWriter, Manifest, Registry, RuntimeError, Subscribe, Supervisor,
    SupervisorConfig,
};

const MANIFEST_KEY: &str = "SERVISOR_MANIFEST";
const JOURNAL_KEY: &str = "SERVISOR_JOURNAL";
const EMIT_MANIFEST_KEY: &str = "SERVISOR_EMIT_MANIFEST";

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(config: &ConfigSnapshot) -> Result<(), RuntimeError> {
    let manifest_path = config.require(MANIFEST_KEY)?;
    let manifest = Manifest::load(manifest_path)?;
    let registry = Registry::from_manifest(&manifest)?;
    let services = registry.resolve_enabled(config)?;
    info!(
        declared = registry.descriptors().len(),
        enabled = services.len(),
        "manifest resolved"
    );

    // The resolved view is the declarative artifact downstream tooling
    // consumes; emit it before anything is spawned.
    if let Some(path) = config.get(EMIT_MANIFEST_KEY) {
        let resolved = registry.to_manifest(config)?;
        std::fs::write(path, resolved.to_json())
            .map_err(servisor::StorageError)
            .map_err(RuntimeError::Storage)?;
        info!(path, "resolved manifest written");
    }

    let log = match config.get(JOURNAL_KEY) {
        Some(path) => Arc::new(EventLog::with_journal(path)?),
        None => Arc::new(EventLog::new()),
    };

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let supervisor = Supervisor::with_log(
        SupervisorConfig::from_snapshot(config)?,
        subscribers,
        log,
    );
    supervisor.run(services).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = ConfigSnapshot::from_env();
    match run(&config).await {
        Ok(()) => {
            info!("all services settled; exiting");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, label = err.as_label(), "supervisor terminated");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
