//! Price Storage
//!
//! Append-only log of observations with "latest per symbol" lookup.

mod memory;

pub use memory::MemoryPriceStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::PriceObservation;

/// Price storage trait
///
/// Implementations must tolerate concurrent `latest` readers alongside a
/// single `append` writer, relying on the backend's own locking.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Create the backing schema if absent. Safe to call on every startup.
    async fn initialize(&self) -> Result<()>;

    /// Insert one record. Never deduplicates.
    async fn append(&self, observation: &PriceObservation) -> Result<()>;

    /// Most recent record for `symbol` by `observed_at`, or `None`
    async fn latest(&self, symbol: &str) -> Result<Option<PriceObservation>>;
}
