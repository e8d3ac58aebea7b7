//! Reporter - drains the registry into a sink on a fixed period
//!
//! Each tick performs one drain. A final drain runs on shutdown so the last
//! partial period still reaches the sink.

use std::sync::Arc;
use std::time::Duration;
use tally_metrics::{DrainOutcome, MetricRegistry, Sink};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Per-run drain counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// Lines written
    pub written: u64,
    /// Drains skipped because the sink was not writable
    pub skipped: u64,
    /// Drains whose write failed
    pub failed: u64,
}

/// Periodic drain driver
pub struct Reporter<S> {
    registry: Arc<MetricRegistry>,
    sink: S,
    period: Duration,
    stats: ReportStats,
}

impl<S: Sink + Send> Reporter<S> {
    /// Create a reporter draining `registry` into `sink` every `period`
    pub fn new(registry: Arc<MetricRegistry>, sink: S, period: Duration) -> Self {
        Self {
            registry,
            sink,
            period,
            stats: ReportStats::default(),
        }
    }

    /// Run until `shutdown` flips to `true`, then drain once more.
    ///
    /// Returns the sink (so callers can close or inspect it) and the run's
    /// counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> (S, ReportStats) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        tracing::info!(period_ms = self.period.as_millis() as u64, "reporter started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_once();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("reporter stopping");
                        break;
                    }
                }
            }
        }

        self.drain_once();
        tracing::info!(
            written = self.stats.written,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "reporter stopped"
        );
        (self.sink, self.stats)
    }

    fn drain_once(&mut self) {
        match self.registry.drain(&mut self.sink) {
            Ok(DrainOutcome::Written { metrics }) => {
                self.stats.written += 1;
                tracing::debug!(metrics, "snapshot written");
            }
            Ok(DrainOutcome::Skipped) => {
                self.stats.skipped += 1;
                tracing::debug!("sink not writable, snapshot skipped");
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!("snapshot write failed: {}", e);
            }
        }
    }
}
