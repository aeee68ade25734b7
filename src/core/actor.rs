//! Per-service actor: supervises one child process.
//!
//! A `ServiceActor` owns the process handle for exactly one
//! [`ServiceDescriptor`] and drives its [`ServiceInstance`] through the
//! lifecycle state machine:
//!
//! ```text
//! loop {
//!   ├─► attempt += 1, transition ─► Starting
//!   ├─► spawn command
//!   │     ├─ spawn error ──────────► policy path (as exit code ≠ 0)
//!   │     └─ child
//!   │          ├─ readiness probe ─► Running | Failed (exhausted)
//!   │          └─ no probe ────────► Running immediately
//!   ├─► wait for exit / stop order
//!   └─► policy path:
//!         ├─ no restart ──► Stopped
//!         ├─ attempts capped ──► Failed
//!         └─ restart ──► Degraded ─ backoff sleep ─► next attempt
//! }
//! ```
//!
//! ## Cancellation semantics
//! Two tokens with distinct jobs:
//! - `shutdown` (global): fires the moment shutdown begins. Aborts
//!   probe polls and backoff sleeps immediately and forbids any further
//!   starts. An actor still probing transitions straight to `Stopping`.
//! - `stop` (per-actor): fired by the supervisor when this service's
//!   turn in the reverse-priority stop sequence arrives. Only then is
//!   the child terminated (SIGTERM, grace, SIGKILL).
//!
//! ## Rules
//! - Attempts run sequentially. The attempt counter resets when a probe
//!   confirms readiness; without a probe there is no evidence of a clean
//!   Running state, so the counter stays monotonic and `max_attempts`
//!   keeps bounding crash loops.
//! - Every transition is appended to the [`EventLog`] before it is
//!   broadcast; a log failure aborts the actor as fatal.
//! - Spawn failure is not special: it enters the same restart-policy
//!   path as an immediate non-zero exit.

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{ServiceError, StorageError};
use crate::events::{Bus, Event, EventKind, EventLog};
use crate::probes::{verify, Verdict};
use crate::registry::ServiceDescriptor;

use super::state::{ServiceInstance, ServiceState};

/// Terminal outcome of one actor, reported to the supervisor.
pub(crate) enum ActorOutcome {
    /// The instance settled in `Stopped`. `forced` is set when the
    /// process ignored the termination signal past the grace period and
    /// had to be killed.
    Stopped { forced: bool },
    /// The instance settled in `Failed`.
    Failed { mandatory: bool, detail: String },
    /// The event log rejected an append; the supervisor must terminate.
    Fatal(StorageError),
}

/// Message sent on the supervisor's completion channel.
pub(crate) struct ActorDone {
    pub name: String,
    pub outcome: ActorOutcome,
}

/// How one spawn attempt ended.
enum AttemptEnd {
    /// Process exited (or failed to spawn). `clean` = exit code 0.
    Exited { clean: bool, detail: String },
    /// Readiness verification consumed its whole schedule.
    ProbeExhausted,
    /// A stop order or shutdown ended the attempt; instance is settled.
    /// `forced` is set when the process had to be killed.
    Canceled { forced: bool },
}

pub(crate) struct ServiceActor {
    descriptor: Arc<ServiceDescriptor>,
    bus: Bus,
    log: Arc<EventLog>,
    grace: Duration,
    done: mpsc::UnboundedSender<ActorDone>,
    spawn_gate: Option<oneshot::Sender<()>>,
}

impl ServiceActor {
    pub(crate) fn new(
        descriptor: Arc<ServiceDescriptor>,
        bus: Bus,
        log: Arc<EventLog>,
        grace: Duration,
        done: mpsc::UnboundedSender<ActorDone>,
        spawn_gate: oneshot::Sender<()>,
    ) -> Self {
        Self {
            descriptor,
            bus,
            log,
            grace,
            done,
            spawn_gate: Some(spawn_gate),
        }
    }

    /// Runs the actor to a terminal state and reports the outcome.
    pub(crate) async fn run(mut self, stop: CancellationToken, shutdown: CancellationToken) {
        let mut instance = ServiceInstance::new(Arc::clone(&self.descriptor));
        let outcome = match self.supervise(&mut instance, &stop, &shutdown).await {
            Ok(outcome) => outcome,
            Err(storage) => ActorOutcome::Fatal(storage),
        };
        // Open the gate even on the earliest exit paths so the
        // supervisor never waits on a dead actor.
        self.open_spawn_gate();
        let _ = self.done.send(ActorDone {
            name: self.descriptor.name().to_string(),
            outcome,
        });
    }

    async fn supervise(
        &mut self,
        instance: &mut ServiceInstance,
        stop: &CancellationToken,
        shutdown: &CancellationToken,
    ) -> Result<ActorOutcome, StorageError> {
        loop {
            // No new starts once shutdown begins. Cancellation routes
            // transient instances through Stopping on the way out.
            if shutdown.is_cancelled() || stop.is_cancelled() {
                self.transition(instance, ServiceState::Stopping, None, None)?;
                self.transition(instance, ServiceState::Stopped, None, None)?;
                return Ok(ActorOutcome::Stopped { forced: false });
            }

            instance.attempt += 1;
            self.transition(instance, ServiceState::Starting, Some(instance.attempt), None)?;

            match self.run_attempt(instance, stop, shutdown).await? {
                AttemptEnd::Canceled { forced } => {
                    return Ok(ActorOutcome::Stopped { forced })
                }
                AttemptEnd::ProbeExhausted => {
                    let err = ServiceError::ProbeExhausted {
                        attempts: self
                            .descriptor
                            .readiness()
                            .map(|r| r.policy.total_polls())
                            .unwrap_or(0),
                    };
                    let detail = err.to_string();
                    instance.last_error = Some(detail.clone());
                    self.transition(instance, ServiceState::Failed, None, Some(detail.clone()))?;
                    return Ok(ActorOutcome::Failed {
                        mandatory: self.descriptor.mandatory(),
                        detail,
                    });
                }
                AttemptEnd::Exited { clean, detail } => {
                    instance.last_error = (!clean).then(|| detail.clone());

                    if !self.descriptor.restart().should_restart(clean) {
                        self.transition(instance, ServiceState::Stopped, None, Some(detail))?;
                        return Ok(ActorOutcome::Stopped { forced: false });
                    }
                    if let Some(max) = self.descriptor.max_attempts() {
                        if instance.attempt >= max {
                            let detail =
                                format!("restart attempts exhausted after {max}: {detail}");
                            instance.last_error = Some(detail.clone());
                            self.transition(
                                instance,
                                ServiceState::Failed,
                                None,
                                Some(detail.clone()),
                            )?;
                            return Ok(ActorOutcome::Failed {
                                mandatory: self.descriptor.mandatory(),
                                detail,
                            });
                        }
                    }
                    if shutdown.is_cancelled() || stop.is_cancelled() {
                        self.transition(instance, ServiceState::Stopping, None, None)?;
                        self.transition(instance, ServiceState::Stopped, None, Some(detail))?;
                        return Ok(ActorOutcome::Stopped { forced: false });
                    }

                    let delay = self
                        .descriptor
                        .backoff()
                        .next(instance.attempt.saturating_sub(1));
                    self.transition(instance, ServiceState::Degraded, None, Some(detail.clone()))?;
                    self.record(
                        Event::new(EventKind::BackoffScheduled)
                            .with_service(self.descriptor.name())
                            .with_attempt(instance.attempt)
                            .with_delay(delay)
                            .with_detail(detail),
                    )?;

                    let interrupted = select! {
                        _ = time::sleep(delay) => false,
                        _ = shutdown.cancelled() => true,
                        _ = stop.cancelled() => true,
                    };
                    if interrupted {
                        self.transition(instance, ServiceState::Stopping, None, None)?;
                        self.transition(instance, ServiceState::Stopped, None, None)?;
                        return Ok(ActorOutcome::Stopped { forced: false });
                    }
                }
            }
        }
    }

    /// Spawns the command once and follows it to the end of the attempt.
    async fn run_attempt(
        &mut self,
        instance: &mut ServiceInstance,
        stop: &CancellationToken,
        shutdown: &CancellationToken,
    ) -> Result<AttemptEnd, StorageError> {
        let spawned = self.spawn_child();
        self.open_spawn_gate();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                let detail = ServiceError::Spawn {
                    error: err.to_string(),
                }
                .to_string();
                debug!(service = self.descriptor.name(), %err, "spawn failed");
                return Ok(AttemptEnd::Exited {
                    clean: false,
                    detail,
                });
            }
        };

        if let Some(readiness) = self.descriptor.readiness() {
            let verdict = select! {
                status = child.wait() => {
                    return Ok(interpret_exit(status));
                }
                verdict = verify(readiness.probe.as_ref(), &readiness.policy, shutdown) => verdict,
            };
            match verdict {
                Verdict::Ready => {
                    self.transition(instance, ServiceState::Running, None, None)?;
                    // Confirmed ready: the failure series is over.
                    instance.attempt = 0;
                    instance.last_error = None;
                }
                Verdict::Exhausted => {
                    self.transition(instance, ServiceState::Stopping, None, None)?;
                    let _ = self.stop_child(&mut child).await;
                    return Ok(AttemptEnd::ProbeExhausted);
                }
                Verdict::Canceled => {
                    // Shutdown began mid-verification: settle in Stopping
                    // now, terminate when this service's stop turn comes.
                    self.transition(instance, ServiceState::Stopping, None, None)?;
                    stop.cancelled().await;
                    let graceful = self.stop_child(&mut child).await;
                    self.transition(instance, ServiceState::Stopped, None, None)?;
                    return Ok(AttemptEnd::Canceled { forced: !graceful });
                }
            }
        } else {
            // No probe: spawned means running.
            self.transition(instance, ServiceState::Running, None, None)?;
        }

        select! {
            status = child.wait() => Ok(interpret_exit(status)),
            _ = stop.cancelled() => {
                self.transition(instance, ServiceState::Stopping, None, None)?;
                let graceful = self.stop_child(&mut child).await;
                self.transition(instance, ServiceState::Stopped, None, None)?;
                Ok(AttemptEnd::Canceled { forced: !graceful })
            }
        }
    }

    fn spawn_child(&self) -> std::io::Result<Child> {
        let command = self.descriptor.command();
        // stdout/stderr are inherited: children log through the
        // supervisor's streams.
        Command::new(&command.program)
            .args(&command.args)
            .kill_on_drop(true)
            .spawn()
    }

    /// Graceful stop: SIGTERM, wait up to the grace period, SIGKILL.
    ///
    /// Returns true when the process exited within grace; false when it
    /// had to be killed.
    async fn stop_child(&self, child: &mut Child) -> bool {
        if let Some(pid) = child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            if time::timeout(self.grace, child.wait()).await.is_ok() {
                return true;
            }
            debug!(
                service = self.descriptor.name(),
                grace = ?self.grace,
                "grace expired, killing"
            );
        }
        let _ = child.kill().await;
        false
    }

    fn open_spawn_gate(&mut self) {
        if let Some(gate) = self.spawn_gate.take() {
            let _ = gate.send(());
        }
    }

    /// Moves the instance to `to`, recording the transition.
    fn transition(
        &self,
        instance: &mut ServiceInstance,
        to: ServiceState,
        attempt: Option<u32>,
        detail: Option<String>,
    ) -> Result<(), StorageError> {
        let from = instance.state;
        instance.state = to;

        let mut ev = Event::new(EventKind::StateChanged)
            .with_service(self.descriptor.name())
            .with_transition(from, to);
        if let Some(attempt) = attempt {
            ev = ev.with_attempt(attempt);
        }
        if let Some(detail) = detail {
            ev = ev.with_detail(detail);
        }
        self.record(ev)
    }

    /// Appends to the authoritative log, then broadcasts.
    fn record(&self, ev: Event) -> Result<(), StorageError> {
        self.log.append(ev.clone())?;
        self.bus.publish(ev);
        Ok(())
    }
}

/// Maps a process exit into the policy path's terms.
fn interpret_exit(status: std::io::Result<std::process::ExitStatus>) -> AttemptEnd {
    match status {
        Ok(status) => match status.code() {
            Some(0) => AttemptEnd::Exited {
                clean: true,
                detail: "exited with code 0".to_string(),
            },
            Some(code) => AttemptEnd::Exited {
                clean: false,
                detail: ServiceError::Exit { code }.to_string(),
            },
            None => AttemptEnd::Exited {
                clean: false,
                detail: "terminated by signal".to_string(),
            },
        },
        Err(err) => AttemptEnd::Exited {
            clean: false,
            detail: format!("wait failed: {err}"),
        },
    }
}
