//! Metric registry and the drain protocol

use crate::error::MetricsResult;
use crate::metric::{DynMetric, Metric, Numeric};
use crate::sink::Sink;
use crate::snapshot::{Snapshot, SnapshotField};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::sync::Arc;

/// Result of a [`MetricRegistry::drain`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A line was written carrying this many metrics
    Written {
        /// Number of metrics in the line
        metrics: usize,
    },
    /// Sink was not writable; nothing was reset
    Skipped,
}

/// Append-only collection of metrics drained into snapshot lines.
///
/// Metrics are kept in creation order, which is also their order in every
/// snapshot. The mutex only guards the collection itself: it is taken by
/// [`create_metric`](Self::create_metric) and [`drain`](Self::drain), never by
/// `set`/`add` on a handle.
///
/// There is no process-wide instance. Share one as `Arc<MetricRegistry>` if
/// several components need it.
pub struct MetricRegistry {
    metrics: Mutex<Vec<Arc<dyn DynMetric>>>,
}

impl MetricRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            metrics: Mutex::new(Vec::new()),
        }
    }

    /// Register a metric starting at zero.
    pub fn create_metric<T: Numeric>(&self, name: impl Into<String>) -> Arc<Metric<T>> {
        self.create_metric_with(name, T::ZERO)
    }

    /// Register a metric with an explicit initial value.
    ///
    /// Names are not checked for uniqueness; a duplicate simply shows up twice
    /// in every snapshot.
    pub fn create_metric_with<T: Numeric>(
        &self,
        name: impl Into<String>,
        initial: T,
    ) -> Arc<Metric<T>> {
        let mut metrics = self.metrics.lock();
        let metric = Arc::new(Metric::new(name, initial));
        metrics.push(Arc::clone(&metric) as Arc<dyn DynMetric>);
        tracing::debug!(
            name = metric.name(),
            kind = %T::KIND,
            index = metrics.len() - 1,
            "metric registered"
        );
        metric
    }

    /// Drain every metric into one line on `sink`.
    ///
    /// A sink that is not writable makes this a no-op: nothing is reset and
    /// no error is returned. Otherwise every metric is read-and-reset in
    /// registration order under one timestamp, and the line is written with a
    /// single call while the registry lock is held.
    pub fn drain<S: Sink + ?Sized>(&self, sink: &mut S) -> MetricsResult<DrainOutcome> {
        if !sink.is_writable() {
            tracing::trace!("sink not writable, drain skipped");
            return Ok(DrainOutcome::Skipped);
        }

        let timestamp = Local::now();
        let metrics = self.metrics.lock();
        let snapshot = Self::collect(&metrics, timestamp);
        sink.write_line(&snapshot.to_line())?;
        drop(metrics);

        tracing::trace!(metrics = snapshot.len(), "drained");
        Ok(DrainOutcome::Written {
            metrics: snapshot.len(),
        })
    }

    /// Read-and-reset every metric, returning the values instead of writing
    /// them anywhere.
    pub fn snapshot(&self) -> Snapshot {
        let timestamp = Local::now();
        let metrics = self.metrics.lock();
        Self::collect(&metrics, timestamp)
    }

    fn collect(metrics: &[Arc<dyn DynMetric>], timestamp: DateTime<Local>) -> Snapshot {
        let fields = metrics
            .iter()
            .map(|m| SnapshotField {
                name: m.name().to_string(),
                kind: m.kind(),
                value: m.get_and_reset_as_string(),
            })
            .collect();
        Snapshot { timestamp, fields }
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    /// Whether nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.metrics
            .lock()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}
