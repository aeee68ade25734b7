//! Readiness probes and the verification loop.
//!
//! A probe is a side-effect-free check of a service's self-reported
//! status — "process alive" is the orchestrator's job; a probe answers
//! the stronger question "has the service reached a usable state".
//!
//! ## Contents
//! - [`Probe`] — async trait every probe implements
//! - [`FnProbe`] — closure-backed probe (tests, custom checks)
//! - [`CommandProbe`] — run a status command and match a success token
//! - [`verify`] / [`Verdict`] — the two-tier retry loop driven by
//!   [`ProbePolicy`](crate::ProbePolicy)

mod command;
mod probe;
mod verifier;

pub use command::CommandProbe;
pub use probe::{FnProbe, Probe, ProbeRef};
pub use verifier::{verify, Verdict};
