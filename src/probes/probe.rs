//! Probe abstraction and a closure-backed implementation.
//!
//! The [`Probe`] trait keeps readiness checks pluggable per service: the
//! verifier never knows whether it is matching a status command's output,
//! hitting a socket, or calling a closure in a test. [`ProbeRef`] is the
//! shared handle (`Arc<dyn Probe>`) descriptors carry.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Shared handle to a probe.
pub type ProbeRef = Arc<dyn Probe>;

/// A side-effect-free readiness check.
///
/// Implementations must be safe to invoke repeatedly: the verifier polls
/// them dozens of times, and a probe must never advance the service's
/// state itself.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Runs one check. Returns true when the service is ready.
    async fn check(&self) -> bool;
}

/// Closure-backed probe.
///
/// Wraps `F: Fn() -> Fut`, producing a fresh future per poll. Shared
/// state, if any, goes into the closure via `Arc` explicitly.
///
/// ## Example
/// ```
/// use servisor::{FnProbe, ProbeRef};
///
/// let p: ProbeRef = FnProbe::arc(|| async { true });
/// ```
pub struct FnProbe<F> {
    f: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    /// Creates a new closure-backed probe.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the probe and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn check(&self) -> bool {
        (self.f)().await
    }
}
