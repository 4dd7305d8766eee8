//! In-memory price store (for development and tests)

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::PriceStore;
use crate::error::{MonitorError, Result};
use crate::model::PriceObservation;

pub struct MemoryPriceStore {
    records: RwLock<HashMap<String, Vec<PriceObservation>>>,
}

impl Default for MemoryPriceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Every record stored for `symbol`, in append order
    pub fn history(&self, symbol: &str) -> Vec<PriceObservation> {
        self.records
            .read()
            .map(|records| records.get(symbol).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Total number of records across all symbols
    pub fn len(&self) -> usize {
        self.records
            .read()
            .map(|records| records.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, observation: &PriceObservation) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| MonitorError::Persist(e.to_string()))?;

        records
            .entry(observation.symbol.clone())
            .or_default()
            .push(observation.clone());

        Ok(())
    }

    async fn latest(&self, symbol: &str) -> Result<Option<PriceObservation>> {
        let records = self
            .records
            .read()
            .map_err(|e| MonitorError::Query(e.to_string()))?;

        // Ties on observed_at go to the later append
        Ok(records.get(symbol).and_then(|history| {
            history
                .iter()
                .enumerate()
                .max_by_key(|(idx, obs)| (obs.observed_at, *idx))
                .map(|(_, obs)| obs.clone())
        }))
    }
}
