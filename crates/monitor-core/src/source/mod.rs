//! Price Sources
//!
//! Abstraction over upstream market-data providers.

mod mock;

pub use mock::{ScriptedPriceSource, StaticPriceSource};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Quote;

/// Price source trait (Strategy pattern)
///
/// One call is one upstream request: no caching, no retry. Every failure
/// (transport, status, body, non-numeric field) is a `MonitorError::Fetch`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Get current price (and 24h variation when available) for a symbol
    async fn fetch(&self, symbol: &str) -> Result<Quote>;

    /// Source name, for logs
    fn name(&self) -> &str;
}
