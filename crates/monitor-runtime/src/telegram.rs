//! Telegram Alert Channel
//!
//! Sends alerts through the Bot API `sendMessage` method as a plain GET
//! with `chat_id` and `text` query parameters.

use std::time::Duration;

use async_trait::async_trait;

use monitor_core::{
    config::TelegramConfig,
    error::{MonitorError, Result},
    notify::Notifier,
};

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram bot notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    config: TelegramConfig,
}

impl TelegramNotifier {
    /// Create a notifier; every request is bounded by `timeout`
    pub fn new(config: TelegramConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: TELEGRAM_API.into(),
            config,
        })
    }

    /// Point at a different API host (self-hosted Bot API server, tests)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.config.token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("chat_id", self.config.chat_id.as_str()), ("text", message)])
            .send()
            .await
            // The URL embeds the bot token
            .map_err(|e| MonitorError::Delivery(e.without_url().to_string()))?;

        // Only transport failures count; the body is ignored
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "Telegram answered with non-success status");
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
