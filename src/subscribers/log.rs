//! Built-in subscriber that renders events through `tracing`.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Renders runtime events as structured log records.
///
/// Attach it for human-readable supervision logs; replace it with a
/// custom [`Subscribe`] implementation for metrics or alerting.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::StateChanged => {
                let from = e.from.map(|s| s.as_label()).unwrap_or("?");
                let to = e.to.map(|s| s.as_label()).unwrap_or("?");
                match e.detail.as_deref() {
                    Some(detail) => {
                        info!(service, from, to, attempt = e.attempt, detail, "state changed")
                    }
                    None => info!(service, from, to, attempt = e.attempt, "state changed"),
                }
            }
            EventKind::BackoffScheduled => {
                warn!(
                    service,
                    delay_ms = e.delay_ms,
                    attempt = e.attempt,
                    detail = e.detail.as_deref(),
                    "restart scheduled"
                );
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithinGrace => info!("all services stopped within grace"),
            EventKind::GraceExceeded => {
                error!(stuck = e.detail.as_deref(), "shutdown grace exceeded")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
