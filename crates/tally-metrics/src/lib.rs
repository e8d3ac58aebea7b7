//! # tally-metrics
//!
//! Typed in-process metrics drained into timestamped snapshot lines.
//!
//! Features:
//! - `Metric<T>` cells over integer and floating-point kinds, lock-free `set`/`add`
//! - Append-only `MetricRegistry` with an atomic read-and-reset drain
//! - One line per drain: `YYYY-MM-DD HH:MM:SS.mmm "name" value ...`
//! - File and stream sinks
//! - JSON snapshot export
//!
//! ## Usage
//!
//! ```
//! use tally_metrics::{MetricRegistry, StreamSink};
//!
//! let registry = MetricRegistry::new();
//! let requests = registry.create_metric::<u64>("requests");
//! let latency = registry.create_metric::<f64>("latency_ms");
//!
//! requests.add(1);
//! latency.set(2.5);
//!
//! let mut sink = StreamSink::new(Vec::new());
//! registry.drain(&mut sink).unwrap();
//!
//! let line = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//! assert!(line.ends_with("\"requests\" 1 \"latency_ms\" 2.500\n"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod metric;
mod registry;
mod sink;
mod snapshot;

pub use error::{validate_name, MetricsError, MetricsResult};
pub use metric::{DynMetric, Metric, MetricKind, Numeric};
pub use registry::{DrainOutcome, MetricRegistry};
pub use sink::{FileSink, Sink, StreamSink};
pub use snapshot::{Snapshot, SnapshotField, TIMESTAMP_FORMAT};

/// Add the elapsed wall time of a block, in milliseconds, to a float metric
#[macro_export]
macro_rules! timed {
    ($metric:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        $metric.add(start.elapsed().as_secs_f64() * 1000.0);
        result
    }};
}
