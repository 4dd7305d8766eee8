//! Latest-price lookups for the read side

use std::sync::Arc;

use crate::error::{MonitorError, Result};
use crate::model::{normalize_symbol, PriceObservation};
use crate::store::PriceStore;

/// Answers "what is the latest known price for X". Safe to share across
/// request handlers while the monitor loop writes.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PriceStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Latest observation for `symbol`.
    ///
    /// Missing or blank symbol → `InvalidRequest`, no record → `NotFound`,
    /// storage failure → `Query`.
    pub async fn latest(&self, symbol: Option<&str>) -> Result<PriceObservation> {
        let symbol = symbol
            .map(normalize_symbol)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MonitorError::InvalidRequest("'symbol' parameter is required".into()))?;

        match self.store.latest(&symbol).await {
            Ok(Some(observation)) => Ok(observation),
            Ok(None) => Err(MonitorError::NotFound(symbol)),
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Error fetching latest price");
                Err(match e {
                    MonitorError::Query(_) => e,
                    other => MonitorError::Query(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quote;
    use crate::store::MemoryPriceStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_missing_symbol() {
        let service = QueryService::new(Arc::new(MemoryPriceStore::new()));

        assert!(matches!(service.latest(None).await, Err(MonitorError::InvalidRequest(_))));
        assert!(matches!(service.latest(Some("  ")).await, Err(MonitorError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_not_found_then_found() {
        let store = Arc::new(MemoryPriceStore::new());
        let service = QueryService::new(store.clone());

        assert!(matches!(
            service.latest(Some("BTCUSDT")).await,
            Err(MonitorError::NotFound(s)) if s == "BTCUSDT"
        ));

        store
            .append(&PriceObservation::new("BTCUSDT", Quote::new(65000.12), Utc::now()))
            .await
            .unwrap();

        let found = service.latest(Some("btcusdt")).await.unwrap();
        assert_eq!(found.symbol, "BTCUSDT");
        assert!((found.price - 65000.12).abs() < f64::EPSILON);
    }
}
