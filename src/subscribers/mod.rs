//! Event subscribers: observability hooks fed from the bus.
//!
//! Subscribers never sit on the critical path. Actors append to the
//! [`EventLog`](crate::EventLog) directly; the bus fans the same events
//! out to whatever observers are attached — a log writer, metrics, an
//! alerting hook.
//!
//! ```text
//! actor ── append ──► EventLog            (authoritative)
//!       ── publish ─► Bus ─► listener ─► SubscriberSet
//!                                    ┌───────┼───────┐
//!                                    ▼       ▼       ▼
//!                               [queue 1][queue 2][queue N]
//!                                worker 1 worker 2 worker N
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
