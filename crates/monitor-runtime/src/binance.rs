//! Binance Ticker Source
//!
//! Implementation of `PriceSource` over Binance-style public ticker
//! endpoints (`<base>?symbol=<SYMBOL>`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use monitor_core::{
    config::{FeedConfig, TickerFormat},
    error::{MonitorError, Result},
    model::Quote,
    source::PriceSource,
};

/// `GET /api/v3/ticker/price`
#[derive(Debug, Deserialize)]
struct PriceTicker {
    price: Value,
}

/// `GET /api/v3/ticker/24hr`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayTicker {
    last_price: Value,
    price_change_percent: Value,
}

/// Binance price source
pub struct BinanceSource {
    client: reqwest::Client,
    config: FeedConfig,
}

impl BinanceSource {
    /// Create a source; every request is bounded by `timeout`
    pub fn new(config: FeedConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client, config))
    }

    /// Create with an existing client
    pub const fn with_client(client: reqwest::Client, config: FeedConfig) -> Self {
        Self { client, config }
    }

    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| MonitorError::fetch(symbol, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::fetch(
                symbol,
                format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MonitorError::fetch(symbol, e))?;

        parse_ticker(self.config.format, &body)
            .map_err(|reason| MonitorError::fetch(symbol, reason))
    }

    fn name(&self) -> &str {
        "Binance"
    }
}

/// Decode a ticker body in the deployment's fixed format
fn parse_ticker(format: TickerFormat, body: &[u8]) -> std::result::Result<Quote, String> {
    match format {
        TickerFormat::Price => {
            let ticker: PriceTicker = serde_json::from_slice(body).map_err(|e| e.to_string())?;
            Ok(Quote::new(parse_number("price", &ticker.price)?))
        }
        TickerFormat::Change24h => {
            let ticker: DayTicker = serde_json::from_slice(body).map_err(|e| e.to_string())?;
            Ok(Quote::with_variation(
                parse_number("lastPrice", &ticker.last_price)?,
                parse_number("priceChangePercent", &ticker.price_change_percent)?,
            ))
        }
    }
}

/// Binance sends numbers as strings; accept either, reject anything non-finite
fn parse_number(field: &str, value: &Value) -> std::result::Result<f64, String> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!("{field} is not numeric: {value}")),
    }
}
