//! Runtime events: the broadcast bus and the append-only log.
//!
//! Two delivery paths exist on purpose:
//!
//! - [`EventLog`] is the **authoritative** record. Actors append every
//!   transition directly; appends are serialized and, when a journal is
//!   attached, a write failure is fatal to the whole supervisor.
//! - [`Bus`] is the **observability** path: a broadcast channel feeding
//!   the subscriber set. Slow subscribers may lag and miss events; the
//!   log never does.

mod bus;
mod event;
mod log;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use log::{EventFilter, EventLog};
