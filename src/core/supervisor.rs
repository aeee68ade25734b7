//! Orchestration runtime.
//!
//! [`Supervisor`] drives a resolved set of [`ServiceDescriptor`]s to
//! completion:
//!
//! - launches one actor per service in ascending priority order,
//!   waiting for each first spawn to be issued before the next starts;
//! - forwards every bus event to the attached subscribers;
//! - watches for OS signals, mandatory-service failure, and journal
//!   failure; any of them begins the stop sequence;
//! - stops services one at a time in descending priority order, each
//!   given the configured grace between SIGTERM and SIGKILL.
//!
//! `run` returns `Ok(())` only when every service settled in a terminal
//! state within the stop budget; every error maps to a non-zero process
//! exit at the binary boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{RuntimeError, StorageError};
use crate::events::{Bus, Event, EventKind, EventLog};
use crate::registry::ServiceDescriptor;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::actor::{ActorDone, ActorOutcome, ServiceActor};
use super::config::SupervisorConfig;
use super::shutdown::wait_for_shutdown_signal;

/// Extra slack on top of the per-service grace when joining an actor
/// task; covers the SIGKILL round-trip after grace expiry.
const JOIN_SLACK: Duration = Duration::from_secs(1);

/// How long to let the subscriber listener drain after the runtime
/// settles before it is aborted.
const DRAIN_BUDGET: Duration = Duration::from_secs(1);

struct ActorHandle {
    name: String,
    stop: CancellationToken,
    join: JoinHandle<()>,
}

/// Multi-service orchestrator.
///
/// Construct it once, then consume it with [`Supervisor::run`] (installs
/// signal handling) or [`Supervisor::run_with_shutdown`] (caller-owned
/// cancellation, used by embedders and tests).
pub struct Supervisor {
    config: SupervisorConfig,
    bus: Bus,
    log: Arc<EventLog>,
    subscribers: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Creates a supervisor with an in-memory event log.
    pub fn new(config: SupervisorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self::with_log(config, subscribers, Arc::new(EventLog::new()))
    }

    /// Creates a supervisor recording into the given log (e.g. one with
    /// a journal attached).
    pub fn with_log(
        config: SupervisorConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
        log: Arc<EventLog>,
    ) -> Self {
        let bus = Bus::new(config.bus_capacity);
        Self {
            config,
            bus,
            log,
            subscribers: Arc::new(SubscriberSet::new(subscribers)),
        }
    }

    /// The authoritative event log.
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// The broadcast bus; useful for ad-hoc receivers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the services until completion or an OS termination signal.
    pub async fn run(self, services: Vec<Arc<ServiceDescriptor>>) -> Result<(), RuntimeError> {
        let shutdown = CancellationToken::new();
        let signal_task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                match wait_for_shutdown_signal().await {
                    Ok(()) => info!("termination signal received"),
                    Err(err) => warn!(%err, "signal listener failed; shutting down"),
                }
                shutdown.cancel();
            }
        });

        let result = self.run_with_shutdown(services, shutdown).await;
        signal_task.abort();
        result
    }

    /// Runs the services until completion or until `shutdown` is
    /// cancelled.
    ///
    /// `services` is expected in resolution order
    /// ([`Registry::resolve_enabled`](crate::Registry::resolve_enabled));
    /// a stable re-sort by priority keeps the contract even for
    /// hand-built lists.
    pub async fn run_with_shutdown(
        self,
        mut services: Vec<Arc<ServiceDescriptor>>,
        shutdown: CancellationToken,
    ) -> Result<(), RuntimeError> {
        services.sort_by_key(|d| d.priority());

        let mut listener = self.spawn_listener();
        let result = self.supervise(services, &shutdown).await;

        // Runtime settled: close the bus so the listener drains out.
        let Supervisor {
            bus, subscribers, ..
        } = self;
        drop(bus);
        if time::timeout(DRAIN_BUDGET, &mut listener).await.is_err() {
            listener.abort();
            let _ = listener.await;
        }
        if let Some(set) = Arc::into_inner(subscribers) {
            set.shutdown().await;
        }
        result
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    fn spawn_listener(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subscribers);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn supervise(
        &self,
        services: Vec<Arc<ServiceDescriptor>>,
        shutdown: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        if services.is_empty() {
            return Ok(());
        }

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(services.len());

        for descriptor in &services {
            let stop = CancellationToken::new();
            let (gate_tx, gate_rx) = oneshot::channel();
            let actor = ServiceActor::new(
                Arc::clone(descriptor),
                self.bus.clone(),
                Arc::clone(&self.log),
                self.config.grace,
                done_tx.clone(),
                gate_tx,
            );
            let join = tokio::spawn(actor.run(stop.clone(), shutdown.clone()));
            // Launch order is the start order: wait until this actor has
            // issued its first spawn (or already finished).
            let _ = gate_rx.await;
            handles.push(ActorHandle {
                name: descriptor.name().to_string(),
                stop,
                join,
            });
        }
        drop(done_tx);

        let mut remaining = handles.len();
        let mut failure: Option<RuntimeError> = None;

        while remaining > 0 {
            select! {
                _ = shutdown.cancelled() => {
                    if let Err(storage) = self.record(Event::new(EventKind::ShutdownRequested)) {
                        failure = Some(RuntimeError::Storage(storage));
                    }
                    break;
                }
                done = done_rx.recv() => {
                    let Some(done) = done else { break };
                    remaining -= 1;
                    match done.outcome {
                        ActorOutcome::Stopped { .. } => {}
                        ActorOutcome::Failed { mandatory, detail } => {
                            if mandatory {
                                warn!(service = done.name, detail, "mandatory service failed");
                                failure = Some(RuntimeError::MandatoryServiceFailed {
                                    service: done.name,
                                    detail,
                                });
                                break;
                            }
                            warn!(service = done.name, detail, "optional service failed");
                        }
                        ActorOutcome::Fatal(storage) => {
                            failure = Some(RuntimeError::Storage(storage));
                            break;
                        }
                    }
                }
            }
        }

        let stop_result = self.stop_all(handles, shutdown, &mut done_rx).await;
        match failure {
            Some(err) => Err(err),
            None => stop_result,
        }
    }

    /// Stops every remaining actor, one at a time, in descending
    /// priority order.
    ///
    /// Shutdown counts as graceful only when every service exits within
    /// its grace after SIGTERM: a service that had to be force-killed,
    /// or whose actor never finished, lands on the stuck list.
    async fn stop_all(
        &self,
        handles: Vec<ActorHandle>,
        shutdown: &CancellationToken,
        done_rx: &mut mpsc::UnboundedReceiver<ActorDone>,
    ) -> Result<(), RuntimeError> {
        // Freezes restarts and aborts in-progress probes and backoffs.
        shutdown.cancel();

        let mut stuck = Vec::new();
        for handle in handles.into_iter().rev() {
            handle.stop.cancel();
            if time::timeout(self.config.grace + JOIN_SLACK, handle.join)
                .await
                .is_err()
            {
                warn!(service = handle.name, "service did not stop in time");
                stuck.push(handle.name);
            }
        }

        // Actors report on the completion channel whether termination
        // needed a forced kill; those stops were not graceful either.
        while let Ok(done) = done_rx.try_recv() {
            if matches!(done.outcome, ActorOutcome::Stopped { forced: true }) {
                warn!(service = done.name, "service ignored termination signal");
                stuck.push(done.name);
            }
        }

        if stuck.is_empty() {
            self.record(Event::new(EventKind::AllStoppedWithinGrace))?;
            Ok(())
        } else {
            stuck.sort_unstable();
            stuck.dedup();
            self.record(
                Event::new(EventKind::GraceExceeded).with_detail(stuck.join(", ")),
            )?;
            Err(RuntimeError::GraceExceeded {
                grace: self.config.grace,
                stuck,
            })
        }
    }

    /// Appends to the authoritative log, then broadcasts.
    fn record(&self, ev: Event) -> Result<(), StorageError> {
        self.log.append(ev.clone())?;
        self.bus.publish(ev);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::ServiceState;
    use crate::events::EventFilter;
    use crate::policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
    use crate::registry::CommandSpec;

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            grace: Duration::from_secs(5),
            bus_capacity: 256,
        }
    }

    fn long_runner(name: &str, priority: i32) -> Arc<ServiceDescriptor> {
        ServiceDescriptor::builder(name, CommandSpec::with_args("sleep", ["30"]))
            .priority(priority)
            .restart(RestartPolicy::Always)
            .build()
    }

    async fn wait_for_state(log: &EventLog, name: &str, state: ServiceState) {
        for _ in 0..200 {
            if log.states().get(name) == Some(&state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{name} never reached {state:?}; states: {:?}", log.states());
    }

    fn seq_of_transitions(log: &EventLog, to: ServiceState) -> Vec<(String, u64)> {
        log.query(&EventFilter {
            to: Some(to),
            ..Default::default()
        })
        .iter()
        .map(|ev| (ev.service.as_deref().unwrap_or("-").to_string(), ev.seq))
        .collect()
    }

    #[tokio::test]
    async fn starts_ascending_and_stops_descending() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let services = vec![
            long_runner("net", 10),
            long_runner("mesh", 20),
            long_runner("tunnel", 30),
        ];
        let run = tokio::spawn(supervisor.run_with_shutdown(services, shutdown.clone()));

        wait_for_state(&log, "net", ServiceState::Running).await;
        wait_for_state(&log, "mesh", ServiceState::Running).await;
        wait_for_state(&log, "tunnel", ServiceState::Running).await;

        shutdown.cancel();
        run.await.unwrap().unwrap();

        let starting = seq_of_transitions(&log, ServiceState::Starting);
        let start_order: Vec<&str> = starting.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(start_order, vec!["net", "mesh", "tunnel"]);
        assert!(starting.windows(2).all(|w| w[0].1 < w[1].1));

        let stopping = seq_of_transitions(&log, ServiceState::Stopping);
        let stop_order: Vec<&str> = stopping.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(stop_order, vec!["tunnel", "mesh", "net"]);

        assert!(log.unsettled().is_empty());
        let settled = log.query(&EventFilter {
            kind: Some(EventKind::AllStoppedWithinGrace),
            ..Default::default()
        });
        assert_eq!(settled.len(), 1);
    }

    #[tokio::test]
    async fn unsorted_input_is_started_by_priority() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let services = vec![long_runner("b", 20), long_runner("a", 10)];
        let run = tokio::spawn(supervisor.run_with_shutdown(services, shutdown.clone()));

        wait_for_state(&log, "a", ServiceState::Running).await;
        wait_for_state(&log, "b", ServiceState::Running).await;
        shutdown.cancel();
        run.await.unwrap().unwrap();

        let starting = seq_of_transitions(&log, ServiceState::Starting);
        let start_order: Vec<&str> = starting.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(start_order, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn mandatory_failure_stops_the_rest() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let doomed = ServiceDescriptor::builder("doomed", CommandSpec::new("false"))
            .priority(10)
            .restart(RestartPolicy::OnFailure)
            .max_attempts(1)
            .mandatory(true)
            .build();
        let services = vec![doomed, long_runner("steady", 20)];

        let err = supervisor
            .run_with_shutdown(services, shutdown)
            .await
            .unwrap_err();
        match err {
            RuntimeError::MandatoryServiceFailed { service, .. } => {
                assert_eq!(service, "doomed");
            }
            other => panic!("expected MandatoryServiceFailed, got {other}"),
        }

        assert_eq!(log.states().get("doomed"), Some(&ServiceState::Failed));
        assert_eq!(log.states().get("steady"), Some(&ServiceState::Stopped));
    }

    #[tokio::test]
    async fn optional_failure_leaves_others_running() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let flaky = ServiceDescriptor::builder("flaky", CommandSpec::new("false"))
            .priority(10)
            .restart(RestartPolicy::OnFailure)
            .backoff(BackoffPolicy {
                first: Duration::from_millis(5),
                max: Duration::from_millis(5),
                factor: 1.0,
                jitter: JitterPolicy::None,
            })
            .max_attempts(2)
            .build();
        let services = vec![flaky, long_runner("steady", 20)];
        let run = tokio::spawn(supervisor.run_with_shutdown(services, shutdown.clone()));

        wait_for_state(&log, "flaky", ServiceState::Failed).await;
        wait_for_state(&log, "steady", ServiceState::Running).await;

        shutdown.cancel();
        run.await.unwrap().unwrap();
        assert_eq!(log.states().get("steady"), Some(&ServiceState::Stopped));
    }

    #[tokio::test]
    async fn all_services_finishing_naturally_is_ok() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let services = vec![
            ServiceDescriptor::builder("one", CommandSpec::new("true"))
                .restart(RestartPolicy::Never)
                .build(),
            ServiceDescriptor::builder("two", CommandSpec::new("true"))
                .restart(RestartPolicy::Never)
                .priority(5)
                .build(),
        ];
        supervisor
            .run_with_shutdown(services, shutdown)
            .await
            .unwrap();

        assert_eq!(log.states().get("one"), Some(&ServiceState::Stopped));
        assert_eq!(log.states().get("two"), Some(&ServiceState::Stopped));
    }

    #[tokio::test]
    async fn stubborn_service_is_reported_stuck() {
        let config = SupervisorConfig {
            grace: Duration::from_millis(100),
            bus_capacity: 256,
        };
        let supervisor = Supervisor::new(config, Vec::new());
        let log = Arc::clone(supervisor.event_log());
        let shutdown = CancellationToken::new();

        let stubborn = ServiceDescriptor::builder(
            "stubborn",
            CommandSpec::with_args("sh", ["-c", "trap '' TERM; sleep 60"]),
        )
        .restart(RestartPolicy::Always)
        .build();
        let run =
            tokio::spawn(supervisor.run_with_shutdown(vec![stubborn], shutdown.clone()));

        wait_for_state(&log, "stubborn", ServiceState::Running).await;
        shutdown.cancel();

        let err = run.await.unwrap().unwrap_err();
        match err {
            RuntimeError::GraceExceeded { stuck, .. } => {
                assert_eq!(stuck, vec!["stubborn"]);
            }
            other => panic!("expected GraceExceeded, got {other}"),
        }

        // The service was force-killed, so it still settled; the exit
        // code is what records the shutdown as non-graceful.
        assert_eq!(log.states().get("stubborn"), Some(&ServiceState::Stopped));
        let exceeded = log.query(&EventFilter {
            kind: Some(EventKind::GraceExceeded),
            ..Default::default()
        });
        assert_eq!(exceeded.len(), 1);
        assert_eq!(exceeded[0].detail.as_deref(), Some("stubborn"));
    }

    #[tokio::test]
    async fn empty_service_set_returns_immediately() {
        let supervisor = Supervisor::new(test_config(), Vec::new());
        let shutdown = CancellationToken::new();
        supervisor
            .run_with_shutdown(Vec::new(), shutdown)
            .await
            .unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn journal_failure_is_fatal() {
        // /dev/full accepts the open but fails every write with ENOSPC.
        let log = Arc::new(EventLog::with_journal("/dev/full").unwrap());
        let supervisor = Supervisor::with_log(test_config(), Vec::new(), log);
        let shutdown = CancellationToken::new();

        let services = vec![ServiceDescriptor::builder("svc", CommandSpec::new("true"))
            .restart(RestartPolicy::Never)
            .build()];
        let err = supervisor
            .run_with_shutdown(services, shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Storage(_)));
    }
}
