//! # monitor-core
//!
//! Periodic market-data monitor: polls a price feed for a fixed set of
//! assets, records every observation, and alerts when a price crosses its
//! configured bounds.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MonitorLoop                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌────────┐  ┌──────────┐  │
//! │  │ PriceSource │─▶│ PriceStore  │─▶│  Rule  │─▶│ Notifier │  │
//! │  └─────────────┘  └──────┬──────┘  └────────┘  └──────────┘  │
//! └──────────────────────────┼──────────────────────────────────┘
//!                            ▼
//!                      QueryService (concurrent reads)
//! ```
//!
//! Every collaborator is a trait object handed in at construction, so the
//! loop runs equally against Binance/PostgreSQL/Telegram or against the
//! in-memory implementations in this crate.

pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod query;
pub mod rule;
pub mod source;
pub mod store;
pub mod ticker;

pub use config::{FeedConfig, MonitorConfig, TelegramConfig, TickerFormat};
pub use error::{MonitorError, Result};
pub use model::{AssetConfig, BreachKind, PriceObservation, Quote, ThresholdBreach};
pub use monitor::{AlertStatus, AssetOutcome, CycleSummary, MonitorLoop};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use query::QueryService;
pub use rule::{evaluate, Classification};
pub use source::{PriceSource, ScriptedPriceSource, StaticPriceSource};
pub use store::{MemoryPriceStore, PriceStore};
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
