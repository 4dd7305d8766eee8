//! Application State

use std::sync::Arc;

use monitor_core::QueryService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Latest-price lookups over the shared store
    pub query: QueryService,

    /// Symbols the monitor loop is polling, in configured order
    pub assets: Arc<Vec<String>>,
}
