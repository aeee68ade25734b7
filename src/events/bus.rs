//! Broadcast bus for runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] providing
//! non-blocking publication from many sources (actors, supervisor) to
//! the subscriber listener.
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the
//!   event is dropped.
//! - Capacity is a shared ring buffer; receivers that fall behind observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest items.
//! - The bus carries no durability guarantees — the authoritative record
//!   is the [`EventLog`](crate::EventLog).

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (the sender is `Arc`-backed internally).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
