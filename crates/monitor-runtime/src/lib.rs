//! # monitor-runtime
//!
//! Concrete adapters for the price monitor.
//!
//! ## Adapters
//!
//! - **Binance**: `PriceSource` over public ticker endpoints
//! - **Telegram**: `Notifier` over the Bot API
//! - **PostgreSQL** (default feature `postgres`): `PriceStore` over `sqlx`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monitor_runtime::{BinanceSource, PgPriceStore, TelegramNotifier};
//!
//! let source = BinanceSource::new(config.feed.clone(), config.request_timeout)?;
//! let store = PgPriceStore::connect(&config.database_url, config.request_timeout).await?;
//! store.initialize().await?;
//! ```

pub mod binance;
pub mod telegram;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use binance::BinanceSource;
pub use telegram::TelegramNotifier;

#[cfg(feature = "postgres")]
pub use postgres::PgPriceStore;

// Re-export core types for convenience
pub use monitor_core::{MonitorError, Notifier, PriceSource, PriceStore, Result};
