//! Error Types for the Price Monitor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// Upstream feed unreachable, non-2xx, timed out, or unparseable
    #[error("Fetch error for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    /// Storage write failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// Storage read failed
    #[error("Query error: {0}")]
    Query(String),

    /// Alert channel failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Malformed or mismatched configuration (startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied a bad request (e.g. missing symbol)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No record exists for the requested symbol
    #[error("Not found: {0}")]
    NotFound(String),
}

impl MonitorError {
    pub fn fetch(symbol: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    /// Only configuration errors stop the process; everything else is
    /// contained to one asset in one cycle.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Stable machine-readable code for API error bodies
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "FETCH_ERROR",
            Self::Persist(_) => "PERSIST_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Convert to a user-facing message that does not leak storage details
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::NotFound(symbol) => format!("Symbol not found: {symbol}"),
            Self::Query(_) | Self::Persist(_) => "Error fetching data".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
