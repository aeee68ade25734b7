//! Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging custom observers
//! into the runtime. Each subscriber gets a dedicated worker task and a
//! bounded queue; a slow subscriber only ever loses its own events.

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// ### Isolation rules
/// - Events are delivered FIFO per subscriber from a dedicated worker.
/// - Queue overflow drops the event for this subscriber only.
/// - Panics are caught by the worker and logged; other subscribers are
///   unaffected.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Short name used in diagnostics ("log", "metrics", ...).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Bounded queue capacity for this subscriber (clamped to 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
