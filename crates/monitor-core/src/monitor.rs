//! Monitor Loop
//!
//! Drives fetch → persist → evaluate → notify for every configured asset,
//! once per cycle, forever.
//!
//! ```text
//! ┌──────────┐ tick ┌───────────────────────────────────────────────┐
//! │  Ticker  │─────▶│ for asset in assets (configured order)        │
//! └──────────┘      │   PriceSource ─▶ PriceStore ─▶ Rule ─▶ Notifier │
//!                   └────────────────────┬──────────────────────────┘
//!                                        ▼
//!                                  CycleSummary
//! ```
//!
//! Failures are contained per asset per cycle: a failed fetch skips that
//! asset, a failed write still evaluates and alerts, a failed alert is
//! logged and dropped. Nothing inside a cycle retries; the next cycle does.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::{MonitorError, Result};
use crate::model::{AssetConfig, BreachKind, PriceObservation};
use crate::notify::Notifier;
use crate::source::PriceSource;
use crate::store::PriceStore;
use crate::ticker::Ticker;

/// What happened to the alert step for one asset
#[derive(Clone, Debug, PartialEq)]
pub enum AlertStatus {
    /// Price within bounds, nothing sent
    Quiet,

    /// Breach detected and the notifier accepted the message
    Delivered(BreachKind),

    /// Breach detected but delivery failed
    DeliveryFailed { kind: BreachKind, reason: String },
}

impl AlertStatus {
    /// The breach that triggered a notification attempt, if any
    pub const fn breach(&self) -> Option<BreachKind> {
        match self {
            Self::Quiet => None,
            Self::Delivered(kind) | Self::DeliveryFailed { kind, .. } => Some(*kind),
        }
    }
}

/// Per-asset result of one cycle
#[derive(Clone, Debug, PartialEq)]
pub enum AssetOutcome {
    /// Fetched, stored, evaluated
    Ok {
        observation: PriceObservation,
        alert: AlertStatus,
    },

    /// Fetch failed; nothing else ran for this asset
    FetchFailed { symbol: String, reason: String },

    /// Fetched and evaluated, but the write failed
    PersistFailed {
        observation: PriceObservation,
        reason: String,
        alert: AlertStatus,
    },
}

impl AssetOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Ok { observation, .. } | Self::PersistFailed { observation, .. } => {
                &observation.symbol
            }
            Self::FetchFailed { symbol, .. } => symbol,
        }
    }

    pub const fn observation(&self) -> Option<&PriceObservation> {
        match self {
            Self::Ok { observation, .. } | Self::PersistFailed { observation, .. } => {
                Some(observation)
            }
            Self::FetchFailed { .. } => None,
        }
    }

    pub const fn alert(&self) -> Option<&AlertStatus> {
        match self {
            Self::Ok { alert, .. } | Self::PersistFailed { alert, .. } => Some(alert),
            Self::FetchFailed { .. } => None,
        }
    }
}

/// Aggregate of one cycle, for logging and tests
#[derive(Clone, Debug)]
pub struct CycleSummary {
    /// 1-based cycle counter
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// One entry per configured asset, in configured order
    pub outcomes: Vec<AssetOutcome>,
}

impl CycleSummary {
    pub fn fetched(&self) -> usize {
        self.outcomes.iter().filter(|o| o.observation().is_some()).count()
    }

    pub fn fetch_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AssetOutcome::FetchFailed { .. }))
            .count()
    }

    pub fn persist_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AssetOutcome::PersistFailed { .. }))
            .count()
    }

    /// `(symbol, kind)` for every breach that triggered a notification attempt
    pub fn breaches(&self) -> Vec<(&str, BreachKind)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.alert().and_then(AlertStatus::breach).map(|kind| (o.symbol(), kind)))
            .collect()
    }

    pub fn alerts_delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.alert(), Some(AlertStatus::Delivered(_))))
            .count()
    }

    fn log(&self) {
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        tracing::info!(
            cycle = self.cycle,
            assets = self.outcomes.len(),
            fetched = self.fetched(),
            fetch_failed = self.fetch_failures(),
            persist_failed = self.persist_failures(),
            breaches = self.breaches().len(),
            alerts_delivered = self.alerts_delivered(),
            elapsed_ms,
            "Cycle complete"
        );
    }
}

/// The polling/evaluation/persistence loop
pub struct MonitorLoop {
    assets: Vec<AssetConfig>,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn PriceStore>,
    notifier: Arc<dyn Notifier>,
    call_timeout: Duration,
    cycles: AtomicU64,
}

impl MonitorLoop {
    pub fn new(
        assets: Vec<AssetConfig>,
        source: Arc<dyn PriceSource>,
        store: Arc<dyn PriceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            assets,
            source,
            store,
            notifier,
            call_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cycles: AtomicU64::new(0),
        }
    }

    /// Bound every fetch, write and alert call. Keep this below the cycle
    /// interval so one hung lookup cannot starve the rest of the cycle.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn assets(&self) -> &[AssetConfig] {
        &self.assets
    }

    /// Run cycles until `shutdown` flips to `true` or the ticker ends.
    ///
    /// Shutdown is checked between cycles; a cycle in progress finishes.
    pub async fn run<T: Ticker>(&self, mut ticker: T, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            assets = self.assets.len(),
            source = self.source.name(),
            notifier = self.notifier.name(),
            "Starting price monitor"
        );

        let mut shutdown_open = true;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Monitor shutdown requested");
                break;
            }

            tokio::select! {
                changed = shutdown.changed(), if shutdown_open => {
                    // Sender gone: nobody can stop us any more, keep ticking
                    if changed.is_err() {
                        shutdown_open = false;
                    }
                }
                ticked = ticker.tick() => {
                    if !ticked {
                        tracing::info!("Ticker ended, stopping monitor");
                        break;
                    }
                    self.run_cycle().await.log();
                }
            }
        }
    }

    /// Run exactly one cycle over every asset, in order
    pub async fn run_cycle(&self) -> CycleSummary {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started_at = Utc::now();
        let span = tracing::info_span!("cycle", cycle, started_at = %started_at.to_rfc3339());

        async {
            let mut outcomes = Vec::with_capacity(self.assets.len());
            for asset in &self.assets {
                outcomes.push(self.process_asset(asset).await);
            }

            CycleSummary {
                cycle,
                started_at,
                finished_at: Utc::now(),
                outcomes,
            }
        }
        .instrument(span)
        .await
    }

    async fn process_asset(&self, asset: &AssetConfig) -> AssetOutcome {
        let symbol = asset.symbol.as_str();

        let fetched = self
            .bounded(self.source.fetch(symbol), || {
                MonitorError::fetch(symbol, format!("timed out after {:?}", self.call_timeout))
            })
            .await;

        let quote = match fetched {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Error getting asset price");
                return AssetOutcome::FetchFailed {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let observation = PriceObservation::new(symbol, quote, Utc::now());
        tracing::info!(
            symbol,
            price = observation.price,
            variation = observation.variation,
            "Current price"
        );

        let persisted = self
            .bounded(self.store.append(&observation), || {
                MonitorError::Persist(format!("write timed out after {:?}", self.call_timeout))
            })
            .await;

        if let Err(e) = &persisted {
            tracing::error!(symbol, error = %e, "Error saving price to database");
        }

        // Alerting runs whether or not the write landed
        let alert = self.alert(asset, observation.price).await;

        match persisted {
            Ok(()) => AssetOutcome::Ok { observation, alert },
            Err(e) => AssetOutcome::PersistFailed {
                observation,
                reason: e.to_string(),
                alert,
            },
        }
    }

    async fn alert(&self, asset: &AssetConfig, price: f64) -> AlertStatus {
        let Some(breach) = asset.check(price) else {
            return AlertStatus::Quiet;
        };

        let message = breach.message();
        let sent = self
            .bounded(self.notifier.send(&message), || {
                MonitorError::Delivery(format!("send timed out after {:?}", self.call_timeout))
            })
            .await;

        match sent {
            Ok(()) => {
                tracing::info!(
                    symbol = %breach.symbol,
                    kind = %breach.kind,
                    "Message sent: {message}"
                );
                AlertStatus::Delivered(breach.kind)
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %breach.symbol,
                    kind = %breach.kind,
                    channel = self.notifier.name(),
                    error = %e,
                    "Error sending alert"
                );
                AlertStatus::DeliveryFailed {
                    kind: breach.kind,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn bounded<T, F>(&self, call: F, on_timeout: impl FnOnce() -> MonitorError) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quote;
    use crate::notify::RecordingNotifier;
    use crate::source::{ScriptedPriceSource, StaticPriceSource};
    use crate::store::MemoryPriceStore;
    use crate::ticker::ManualTicker;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Store whose writes always fail
    struct BrokenStore;

    #[async_trait]
    impl PriceStore for BrokenStore {
        async fn initialize(&self) -> Result<()> {
            Ok(())
        }

        async fn append(&self, _observation: &PriceObservation) -> Result<()> {
            Err(MonitorError::Persist("connection refused".into()))
        }

        async fn latest(&self, _symbol: &str) -> Result<Option<PriceObservation>> {
            Err(MonitorError::Query("connection refused".into()))
        }
    }

    /// Source that answers after one second
    #[derive(Default)]
    struct SlowSource {
        started: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for SlowSource {
        async fn fetch(&self, _symbol: &str) -> Result<Quote> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(Quote::new(55000.0))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    /// Source that never answers
    struct HangingSource;

    #[async_trait]
    impl PriceSource for HangingSource {
        async fn fetch(&self, _symbol: &str) -> Result<Quote> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn btc() -> AssetConfig {
        AssetConfig::new("BTCUSDT", 60000.0, 50000.0)
    }

    fn eth() -> AssetConfig {
        AssetConfig::new("ETHUSDT", 4000.0, 3000.0)
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn test_three_cycles_one_max_one_min() {
        let source = Arc::new(ScriptedPriceSource::new());
        source.push_prices("BTCUSDT", &[55000.0, 61000.0, 45000.0]);
        let store = Arc::new(MemoryPriceStore::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let monitor = MonitorLoop::new(vec![btc()], source, store.clone(), notifier.clone());

        let first = monitor.run_cycle().await;
        let second = monitor.run_cycle().await;
        let third = monitor.run_cycle().await;

        assert!(first.breaches().is_empty());
        assert_eq!(second.breaches(), vec![("BTCUSDT", BreachKind::Max)]);
        assert_eq!(third.breaches(), vec![("BTCUSDT", BreachKind::Min)]);
        assert_eq!((first.cycle, second.cycle, third.cycle), (1, 2, 3));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("maximum"));
        assert!(messages[1].contains("minimum"));
        assert_eq!(store.history("BTCUSDT").len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_isolated_to_asset() {
        let source = Arc::new(ScriptedPriceSource::new());
        source.push_failure("BTCUSDT", "connection reset");
        source.push_prices("ETHUSDT", &[3500.0]);
        let store = Arc::new(MemoryPriceStore::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let monitor = MonitorLoop::new(vec![btc(), eth()], source.clone(), store.clone(), notifier);
        let summary = monitor.run_cycle().await;

        assert_eq!(source.calls(), vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(summary.fetch_failures(), 1);
        assert_eq!(summary.fetched(), 1);
        assert!(matches!(
            &summary.outcomes[0],
            AssetOutcome::FetchFailed { symbol, .. } if symbol == "BTCUSDT"
        ));
        assert!(matches!(&summary.outcomes[1], AssetOutcome::Ok { .. }));
        assert!(store.history("BTCUSDT").is_empty());
        assert_eq!(store.history("ETHUSDT").len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_still_alerts() {
        let source = Arc::new(StaticPriceSource::new().with_quote("BTCUSDT", Quote::new(70000.0)));
        let notifier = Arc::new(RecordingNotifier::new());

        let monitor =
            MonitorLoop::new(vec![btc()], source, Arc::new(BrokenStore), notifier.clone());
        let summary = monitor.run_cycle().await;

        assert_eq!(summary.persist_failures(), 1);
        assert_eq!(summary.alerts_delivered(), 1);
        assert_eq!(notifier.messages().len(), 1);
        match &summary.outcomes[0] {
            AssetOutcome::PersistFailed { reason, alert, .. } => {
                assert!(reason.contains("connection refused"));
                assert_eq!(*alert, AlertStatus::Delivered(BreachKind::Max));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_cycle() {
        let source = Arc::new(
            StaticPriceSource::new()
                .with_quote("BTCUSDT", Quote::new(40000.0))
                .with_quote("ETHUSDT", Quote::new(5000.0)),
        );
        let store = Arc::new(MemoryPriceStore::new());
        let notifier = Arc::new(RecordingNotifier::failing());

        let monitor = MonitorLoop::new(vec![btc(), eth()], source, store.clone(), notifier.clone());
        let summary = monitor.run_cycle().await;

        assert_eq!(notifier.messages().len(), 2);
        assert_eq!(summary.alerts_delivered(), 0);
        assert_eq!(summary.breaches().len(), 2);
        assert!(matches!(
            summary.outcomes[0].alert(),
            Some(AlertStatus::DeliveryFailed { kind: BreachKind::Min, .. })
        ));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_renotifies_every_cycle_in_breach() {
        let source = Arc::new(StaticPriceSource::new().with_quote("BTCUSDT", Quote::new(65000.0)));
        let notifier = Arc::new(RecordingNotifier::new());

        let monitor = MonitorLoop::new(
            vec![btc()],
            source,
            Arc::new(MemoryPriceStore::new()),
            notifier.clone(),
        );
        for _ in 0..3 {
            monitor.run_cycle().await;
        }

        assert_eq!(notifier.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_variation_carried_to_store() {
        let source = Arc::new(
            StaticPriceSource::new().with_quote("ETHUSDT", Quote::with_variation(3456.7, -2.25)),
        );
        let store = Arc::new(MemoryPriceStore::new());

        let monitor = MonitorLoop::new(
            vec![eth()],
            source,
            store.clone(),
            Arc::new(RecordingNotifier::new()),
        );
        monitor.run_cycle().await;

        let latest = store.latest("ETHUSDT").await.unwrap().unwrap();
        assert_eq!(latest.variation, Some(-2.25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out() {
        let monitor = MonitorLoop::new(
            vec![btc(), eth()],
            Arc::new(HangingSource),
            Arc::new(MemoryPriceStore::new()),
            Arc::new(RecordingNotifier::new()),
        )
        .with_call_timeout(Duration::from_secs(5));

        let summary = monitor.run_cycle().await;

        assert_eq!(summary.fetch_failures(), 2);
        match &summary.outcomes[1] {
            AssetOutcome::FetchFailed { symbol, reason } => {
                assert_eq!(symbol, "ETHUSDT");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_until_ticker_ends() {
        let source = Arc::new(ScriptedPriceSource::new());
        source.push_prices("BTCUSDT", &[55000.0, 61000.0, 45000.0]);
        let store = Arc::new(MemoryPriceStore::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let monitor = MonitorLoop::new(vec![btc()], source, store.clone(), notifier.clone());
        monitor.run(ManualTicker::with_ticks(3), no_shutdown()).await;

        assert_eq!(store.history("BTCUSDT").len(), 3);
        assert_eq!(notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_after_completed_cycle() {
        let source = Arc::new(ScriptedPriceSource::new());
        source.push_prices("BTCUSDT", &[55000.0, 61000.0]);
        let store = Arc::new(MemoryPriceStore::new());
        let (tx, rx) = watch::channel(false);
        let (ticker, handle) = ManualTicker::channel();

        let monitor = MonitorLoop::new(
            vec![btc()],
            source.clone(),
            store.clone(),
            Arc::new(RecordingNotifier::new()),
        );
        let task = tokio::spawn(async move { monitor.run(ticker, rx).await });

        assert!(handle.tick());
        while store.is_empty() {
            tokio::task::yield_now().await;
        }

        tx.send(true).unwrap();
        task.await.unwrap();

        // Loop is gone; the ticker was dropped with it
        assert!(!handle.tick());
        assert_eq!(source.calls(), vec!["BTCUSDT"]);
        assert_eq!(store.history("BTCUSDT").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_lets_cycle_in_progress_finish() {
        let source = Arc::new(SlowSource::default());
        let store = Arc::new(MemoryPriceStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let (tx, rx) = watch::channel(false);
        let (ticker, handle) = ManualTicker::channel();

        let monitor = MonitorLoop::new(
            vec![btc(), eth()],
            source.clone(),
            store.clone(),
            notifier.clone(),
        );
        let task = tokio::spawn(async move { monitor.run(ticker, rx).await });

        assert!(handle.tick());
        while source.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // First fetch is still sleeping
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(source.started.load(Ordering::SeqCst), 2);
        assert_eq!(store.len(), 2);
        // ETHUSDT at 55000 is over its 4000 max
        assert_eq!(notifier.messages().len(), 1);
        assert!(!handle.tick());
    }
}
