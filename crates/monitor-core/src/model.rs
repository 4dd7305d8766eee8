//! Domain Models
//!
//! Core data types for the price monitor. Prices are `f64` end to end;
//! the PostgreSQL adapter converts to exact decimals at the column boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rule::{self, Classification};

/// Normalize a ticker symbol the same way on every write and read path
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A monitored asset with its alert bounds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Ticker symbol (e.g., "BTCUSDT")
    pub symbol: String,

    /// Alert when the price reaches or exceeds this value
    pub max_threshold: f64,

    /// Alert when the price reaches or falls below this value
    pub min_threshold: f64,
}

impl AssetConfig {
    pub fn new(symbol: impl AsRef<str>, max_threshold: f64, min_threshold: f64) -> Self {
        Self {
            symbol: normalize_symbol(symbol.as_ref()),
            max_threshold,
            min_threshold,
        }
    }

    /// Compare a price against this asset's bounds
    pub fn classify(&self, price: f64) -> Classification {
        rule::evaluate(price, self.max_threshold, self.min_threshold)
    }

    /// Returns the breach for `price`, if any
    pub fn check(&self, price: f64) -> Option<ThresholdBreach> {
        let kind = match self.classify(price) {
            Classification::None => return None,
            Classification::MaxBreach => BreachKind::Max,
            Classification::MinBreach => BreachKind::Min,
        };

        Some(ThresholdBreach {
            symbol: self.symbol.clone(),
            price,
            kind,
        })
    }
}

/// Raw answer from a price source, before the loop stamps symbol and time
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,

    /// 24-hour percentage change, when the feed provides it
    pub variation: Option<f64>,
}

impl Quote {
    pub const fn new(price: f64) -> Self {
        Self { price, variation: None }
    }

    pub const fn with_variation(price: f64, variation: f64) -> Self {
        Self {
            price,
            variation: Some(variation),
        }
    }
}

/// One recorded price for one asset in one cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<f64>,

    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(symbol: impl Into<String>, quote: Quote, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price: quote.price,
            variation: quote.variation,
            observed_at,
        }
    }
}

/// Which bound was crossed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreachKind {
    Max,
    Min,
}

impl BreachKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "maximum",
            Self::Min => "minimum",
        }
    }
}

impl std::fmt::Display for BreachKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient breach; handed to the notifier and dropped
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdBreach {
    pub symbol: String,
    pub price: f64,
    pub kind: BreachKind,
}

impl ThresholdBreach {
    /// Human-readable alert text
    pub fn message(&self) -> String {
        format!(
            "Alert: the price of asset {} has reached the {} value of ${:.2}",
            self.symbol, self.kind, self.price
        )
    }
}
