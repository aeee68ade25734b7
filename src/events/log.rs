//! Append-only supervisor event log.
//!
//! [`EventLog`] is the authoritative record of every lifecycle
//! transition. Appends are serialized under a mutex; queries iterate a
//! snapshot in insertion order and can be repeated freely.
//!
//! An optional JSON-lines journal can be attached. In-memory appends
//! cannot fail; once a journal is attached, a write failure surfaces as
//! [`StorageError`] and the supervisor treats it as fatal — running
//! blind is worse than not running.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::ServiceState;
use crate::errors::StorageError;

use super::event::{Event, EventKind};

/// Filter for [`EventLog::query`]. Empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Match only events for this service.
    pub service: Option<String>,
    /// Match only events of this kind.
    pub kind: Option<EventKind>,
    /// Match only transitions into this state.
    pub to: Option<ServiceState>,
}

impl EventFilter {
    /// True if `ev` satisfies every set field.
    pub fn matches(&self, ev: &Event) -> bool {
        if let Some(service) = &self.service {
            if ev.service.as_deref() != Some(service.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if ev.kind != kind {
                return false;
            }
        }
        if let Some(to) = self.to {
            if ev.to != Some(to) {
                return false;
            }
        }
        true
    }
}

/// Append-only, insertion-ordered event store with an optional journal.
pub struct EventLog {
    entries: Mutex<Vec<Arc<Event>>>,
    journal: Option<Mutex<File>>,
}

impl EventLog {
    /// Creates an in-memory log. Appends never fail.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Creates a log that also journals each event as a JSON line
    /// appended to `path`.
    pub fn with_journal(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(StorageError)?;
        Ok(Self {
            entries: Mutex::new(Vec::new()),
            journal: Some(Mutex::new(file)),
        })
    }

    /// Appends one event.
    ///
    /// The in-memory append always succeeds; a journal write failure is
    /// returned as [`StorageError`] after the in-memory record has been
    /// kept (the caller escalates, nothing is silently lost).
    pub fn append(&self, ev: Event) -> Result<(), StorageError> {
        let ev = Arc::new(ev);
        lock(&self.entries).push(Arc::clone(&ev));

        if let Some(journal) = &self.journal {
            let mut file = lock(journal);
            let line = serde_json::to_string(ev.as_ref())
                .map_err(|e| StorageError(std::io::Error::other(e)))?;
            writeln!(file, "{line}").map_err(StorageError)?;
        }
        Ok(())
    }

    /// Returns matching events in insertion order.
    ///
    /// The result is a finite snapshot and can be iterated any number of
    /// times; appends after the call are not reflected.
    pub fn query(&self, filter: &EventFilter) -> Vec<Arc<Event>> {
        lock(&self.entries)
            .iter()
            .filter(|ev| filter.matches(ev))
            .cloned()
            .collect()
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// True if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Latest known state per service, derived from the transition
    /// record.
    pub fn states(&self) -> HashMap<String, ServiceState> {
        let mut states = HashMap::new();
        for ev in lock(&self.entries).iter() {
            if let (Some(service), Some(to)) = (&ev.service, ev.to) {
                states.insert(service.to_string(), to);
            }
        }
        states
    }

    /// Names of services whose latest state is not terminal, sorted.
    ///
    /// Used during shutdown to report which services failed to stop
    /// within the grace period.
    pub fn unsettled(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states()
            .into_iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(name, _)| name)
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Locks a mutex, recovering the data on poisoning.
///
/// An appender that panicked cannot leave the log half-written (appends
/// are a single `push`), so the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
