//! Alert Notifiers
//!
//! Best-effort outbound alert channels. Failures surface as
//! `MonitorError::Delivery`; callers log and discard them.

mod recording;

pub use recording::RecordingNotifier;

use async_trait::async_trait;

use crate::error::Result;

/// Sink for alert messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one human-readable message. No queueing, no ordering guarantee.
    async fn send(&self, message: &str) -> Result<()>;

    /// Channel name, for logs
    fn name(&self) -> &str;
}

/// Writes alerts to the log. Used when no alert channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        tracing::warn!(channel = "log", "{message}");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
