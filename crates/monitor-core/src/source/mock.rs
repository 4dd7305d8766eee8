//! Deterministic Price Sources
//!
//! For tests and offline demo runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::PriceSource;
use crate::error::{MonitorError, Result};
use crate::model::{normalize_symbol, Quote};

/// Returns the same quote for a symbol on every call
#[derive(Default)]
pub struct StaticPriceSource {
    quotes: HashMap<String, Quote>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, symbol: &str, quote: Quote) -> Self {
        self.quotes.insert(normalize_symbol(symbol), quote);
        self
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        self.quotes
            .get(&normalize_symbol(symbol))
            .copied()
            .ok_or_else(|| MonitorError::fetch(symbol, "unknown symbol"))
    }

    fn name(&self) -> &str {
        "StaticSource"
    }
}

/// Replays a per-symbol script of quotes and failures, one entry per call.
///
/// An exhausted script fails the fetch. Every call is logged in order so
/// tests can assert which symbols were visited.
#[derive(Default)]
pub struct ScriptedPriceSource {
    scripts: Mutex<HashMap<String, VecDeque<std::result::Result<Quote, String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful quote for `symbol`
    pub fn push_quote(&self, symbol: &str, quote: Quote) -> &Self {
        self.push(symbol, Ok(quote))
    }

    /// Queue a failure for `symbol`
    pub fn push_failure(&self, symbol: &str, reason: impl Into<String>) -> &Self {
        self.push(symbol, Err(reason.into()))
    }

    /// Queue one plain price per cycle for `symbol`
    pub fn push_prices(&self, symbol: &str, prices: &[f64]) -> &Self {
        for price in prices {
            self.push_quote(symbol, Quote::new(*price));
        }
        self
    }

    /// Symbols fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, symbol: &str, entry: std::result::Result<Quote, String>) -> &Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(normalize_symbol(symbol))
            .or_default()
            .push_back(entry);
        self
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(symbol.to_string());

        let next = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&normalize_symbol(symbol))
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(quote)) => Ok(quote),
            Some(Err(reason)) => Err(MonitorError::fetch(symbol, reason)),
            None => Err(MonitorError::fetch(symbol, "script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "ScriptedSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source() {
        let source =
            StaticPriceSource::new().with_quote("btcusdt", Quote::with_variation(65000.12, 1.5));

        let quote = source.fetch("BTCUSDT").await.unwrap();
        assert!((quote.price - 65000.12).abs() < f64::EPSILON);
        assert_eq!(quote.variation, Some(1.5));

        assert!(source.fetch("NOTREAL").await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_source_replays_in_order() {
        let source = ScriptedPriceSource::new();
        source
            .push_quote("BTCUSDT", Quote::new(1.0))
            .push_failure("BTCUSDT", "upstream 502")
            .push_quote("BTCUSDT", Quote::new(3.0));

        assert!((source.fetch("BTCUSDT").await.unwrap().price - 1.0).abs() < f64::EPSILON);

        let err = source.fetch("BTCUSDT").await.unwrap_err();
        assert!(err.to_string().contains("upstream 502"));

        assert!((source.fetch("BTCUSDT").await.unwrap().price - 3.0).abs() < f64::EPSILON);
        assert!(source.fetch("BTCUSDT").await.is_err());
        assert_eq!(source.calls().len(), 4);
    }
}
