//! price-monitor
//!
//! Polls the configured assets on a fixed interval, stores every price,
//! alerts on threshold breaches and serves the latest stored price over
//! HTTP.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monitor_core::{
    IntervalTicker, LogNotifier, MonitorConfig, MonitorLoop, Notifier, PriceSource, PriceStore,
    QueryService,
};
use monitor_runtime::{BinanceSource, PgPriceStore, TelegramNotifier};

use crate::handlers::{get_prices, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment (before tracing so RUST_LOG may come from .env)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration errors are fatal before any network activity
    let config = MonitorConfig::from_env().inspect_err(|e| {
        tracing::error!("✗ Invalid configuration: {e}");
    })?;

    tracing::info!("Monitoring {} assets:", config.assets.len());
    for asset in &config.assets {
        tracing::info!(
            "  • {} (min {}, max {})",
            asset.symbol,
            asset.min_threshold,
            asset.max_threshold
        );
    }

    // Storage
    let store: Arc<dyn PriceStore> =
        Arc::new(PgPriceStore::connect(&config.database_url, config.request_timeout).await?);
    store.initialize().await?;
    tracing::info!("✓ Connected to PostgreSQL");

    // Price feed
    let source: Arc<dyn PriceSource> =
        Arc::new(BinanceSource::new(config.feed.clone(), config.request_timeout)?);
    tracing::info!("✓ Price feed: {} ({:?})", config.feed.base_url, config.feed.format);

    // Alert channel
    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => {
            tracing::info!("✓ Telegram configured");
            Arc::new(TelegramNotifier::new(telegram.clone(), config.request_timeout)?)
        }
        None => {
            tracing::warn!("⚠ Telegram not configured - alerts go to the log only");
            tracing::warn!("  Set TELEGRAM_TOKEN and TELEGRAM_CHAT_ID in .env");
            Arc::new(LogNotifier)
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_tx.subscribe();

    // Monitor loop
    let monitor = MonitorLoop::new(config.assets.clone(), source, store.clone(), notifier)
        .with_call_timeout(config.request_timeout);
    let ticker = IntervalTicker::new(config.check_interval);
    tracing::info!("Checking prices every {:?}", config.check_interval);
    let monitor_task = tokio::spawn(async move { monitor.run(ticker, shutdown_rx).await });

    // Ctrl-C fans out to the loop and the server
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {e}");
                // Dropping the sender would read as a shutdown request
                std::future::pending::<()>().await;
            }
        }
    });

    // Build application state
    let state = AppState {
        query: QueryService::new(store),
        assets: Arc::new(config.assets.iter().map(|a| a.symbol.clone()).collect()),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("🚀 Server running on http://{}", config.bind_addr);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /get-prices?symbol=BTCUSDT");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    monitor_task.await?;
    tracing::info!("Stopped");

    Ok(())
}

/// Routes for the query endpoint; other methods get 405 from the router
pub(crate) fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/get-prices", get(get_prices))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
