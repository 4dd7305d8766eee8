//! Cycle Scheduling
//!
//! The loop never sleeps directly; it waits on a [`Ticker`]. Production uses
//! a tokio interval, tests drive cycles by hand.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of cycle start signals
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next cycle. `false` means the schedule has ended.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker. The first tick fires immediately; a cycle that
/// overruns the period delays the next tick instead of bursting.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Channel-driven ticker. Ends once every [`TickHandle`] is dropped and
/// queued ticks are drained.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sending half of a [`ManualTicker`]
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl TickHandle {
    /// Queue one cycle. Returns `false` if the ticker is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl ManualTicker {
    pub fn channel() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }

    /// A ticker that yields exactly `n` cycles and then ends
    pub fn with_ticks(n: usize) -> Self {
        let (ticker, handle) = Self::channel();
        for _ in 0..n {
            handle.tick();
        }
        ticker
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_ticker_drains_then_ends() {
        let mut ticker = ManualTicker::with_ticks(2);
        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_first_tick_immediate() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(60));
        assert_eq!(ticker.period(), Duration::from_secs(60));

        let start = tokio::time::Instant::now();
        assert!(ticker.tick().await);
        assert!(start.elapsed() < Duration::from_secs(1));

        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}
