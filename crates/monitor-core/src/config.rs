//! Configuration
//!
//! Everything is read once at startup. Parsing is a pure function over a
//! variable lookup so it can be exercised without touching the process
//! environment; [`MonitorConfig::from_env`] is the thin wrapper used by `main`.

use std::time::Duration;

use crate::error::{MonitorError, Result};
use crate::model::{normalize_symbol, AssetConfig};

pub const DEFAULT_FEED_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Widest symbol the price table accepts (`VARCHAR(20)`)
pub const MAX_SYMBOL_LEN: usize = 20;

/// Response shape of the upstream ticker endpoint.
///
/// Fixed per deployment, never negotiated at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickerFormat {
    /// `{symbol, price}`
    Price,

    /// `{symbol, lastPrice, priceChangePercent}`
    #[default]
    Change24h,
}

impl TickerFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(Self::Price),
            "24hr" | "24h" | "change24h" => Ok(Self::Change24h),
            other => Err(MonitorError::Config(format!(
                "PRICE_FEED_FORMAT must be 'price' or '24hr', got '{other}'"
            ))),
        }
    }
}

/// Upstream price feed settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    pub base_url: String,
    pub format: TickerFormat,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.into(),
            format: TickerFormat::default(),
        }
    }
}

/// Telegram alert channel credentials
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Full process configuration
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Monitored assets, in configured order
    pub assets: Vec<AssetConfig>,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Alert channel (None = log-only alerts)
    pub telegram: Option<TelegramConfig>,

    pub feed: FeedConfig,

    /// Time between cycle starts
    pub check_interval: Duration,

    /// Upper bound on any single network or storage call
    pub request_timeout: Duration,

    /// Query endpoint listen address
    pub bind_addr: String,
}

impl MonitorConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank means unset, for every variable
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| MonitorError::Config(format!("{key} not set")))
        };

        let assets = parse_assets(
            &required("ASSETS")?,
            &required("MAX_THRESHOLDS")?,
            &required("MIN_THRESHOLDS")?,
        )?;

        let database_url = required("DATABASE_URL")?;

        let telegram = match (optional("TELEGRAM_TOKEN"), optional("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            (None, None) => None,
            _ => {
                return Err(MonitorError::Config(
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT_ID must be set together".into(),
                ));
            }
        };

        let feed = FeedConfig {
            base_url: optional("PRICE_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.into()),
            format: optional("PRICE_FEED_FORMAT")
                .map(|s| TickerFormat::parse(&s))
                .transpose()?
                .unwrap_or_default(),
        };

        let check_interval = Duration::from_secs(parse_secs(
            "CHECK_INTERVAL_SECS",
            optional("CHECK_INTERVAL_SECS"),
            DEFAULT_CHECK_INTERVAL_SECS,
        )?);
        let request_timeout = Duration::from_secs(parse_secs(
            "REQUEST_TIMEOUT_SECS",
            optional("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        if request_timeout >= check_interval {
            return Err(MonitorError::Config(format!(
                "REQUEST_TIMEOUT_SECS ({}) must be shorter than CHECK_INTERVAL_SECS ({})",
                request_timeout.as_secs(),
                check_interval.as_secs()
            )));
        }

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());

        Ok(Self {
            assets,
            database_url,
            telegram,
            feed,
            check_interval,
            request_timeout,
            bind_addr,
        })
    }
}

/// Zip the three comma-separated lists into asset configs.
///
/// Lengths must match, every threshold must be a finite float, and
/// `min <= max` for every asset. Symbols must fit the storage column.
pub fn parse_assets(
    assets: &str,
    max_thresholds: &str,
    min_thresholds: &str,
) -> Result<Vec<AssetConfig>> {
    let symbols: Vec<String> = assets.split(',').map(normalize_symbol).collect();
    if let Some(pos) = symbols.iter().position(String::is_empty) {
        return Err(MonitorError::Config(format!("ASSETS entry {} is empty", pos + 1)));
    }
    if let Some(long) = symbols.iter().find(|s| s.chars().count() > MAX_SYMBOL_LEN) {
        return Err(MonitorError::Config(format!(
            "ASSETS entry '{long}' is longer than {MAX_SYMBOL_LEN} characters"
        )));
    }

    let maxes = parse_floats("MAX_THRESHOLDS", max_thresholds)?;
    let mins = parse_floats("MIN_THRESHOLDS", min_thresholds)?;

    if symbols.len() != maxes.len() || symbols.len() != mins.len() {
        return Err(MonitorError::Config(format!(
            "The number of assets and price limits do not match: {} assets, {} max, {} min",
            symbols.len(),
            maxes.len(),
            mins.len()
        )));
    }

    symbols
        .into_iter()
        .zip(maxes)
        .zip(mins)
        .map(|((symbol, max), min)| {
            if min > max {
                return Err(MonitorError::Config(format!(
                    "{symbol}: min threshold {min} exceeds max threshold {max}"
                )));
            }
            Ok(AssetConfig::new(symbol, max, min))
        })
        .collect()
}

fn parse_floats(name: &str, raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .map(|s| match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(MonitorError::Config(format!(
                "Error converting {name}: '{s}' is not a number"
            ))),
        })
        .collect()
}

fn parse_secs(name: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        None => Ok(default),
        Some(s) => match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(MonitorError::Config(format!(
                "{name} must be a positive integer, got '{s}'"
            ))),
            Ok(v) => Ok(v),
        },
    }
}
