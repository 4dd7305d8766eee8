//! Recording notifier (for tests)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::Notifier;
use crate::error::{MonitorError, Result};

/// Keeps every message it is asked to send.
///
/// Attempts are recorded even when delivery is set to fail, so tests can
/// count notification attempts independently of outcome.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages attempted so far, in order
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());

        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::Delivery("recording notifier set to fail".into()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_even_when_failing() {
        let notifier = RecordingNotifier::failing();
        assert!(notifier.send("first").await.is_err());

        notifier.set_failing(false);
        assert!(notifier.send("second").await.is_ok());

        assert_eq!(notifier.messages(), vec!["first", "second"]);
    }
}
