//! Synthetic workload that hammers the registered metrics from several threads

use crate::config::{MetricSpec, MetricsConfig};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tally_metrics::{timed, Metric, MetricKind, MetricRegistry};

/// Pause between workload iterations
const ITERATION_PAUSE: Duration = Duration::from_millis(1);

/// Name of the metric that accumulates time spent inside workload iterations
pub const BUSY_METRIC: &str = "workload_busy_ms";

/// Handle to a registered metric of either kind
#[derive(Debug, Clone)]
pub enum MetricHandle {
    /// Signed integer metric
    Integer(Arc<Metric<i64>>),
    /// Floating-point metric
    Float(Arc<Metric<f64>>),
}

impl MetricHandle {
    fn register(registry: &MetricRegistry, spec: &MetricSpec) -> Self {
        match spec.kind {
            MetricKind::Integer => MetricHandle::Integer(
                registry.create_metric_with(spec.name.clone(), spec.initial as i64),
            ),
            MetricKind::Float => {
                MetricHandle::Float(registry.create_metric_with(spec.name.clone(), spec.initial))
            }
        }
    }

    fn bump<R: Rng>(&self, rng: &mut R) {
        match self {
            MetricHandle::Integer(m) => m.add(rng.gen_range(0..10)),
            MetricHandle::Float(m) => m.add(rng.gen_range(0.0..5.0)),
        }
    }
}

/// Register every configured metric, in order
pub fn register_all(registry: &MetricRegistry, config: &MetricsConfig) -> Vec<MetricHandle> {
    config
        .metrics
        .iter()
        .map(|spec| MetricHandle::register(registry, spec))
        .collect()
}

/// Running workload threads
pub struct Workload {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<u64>>,
}

impl Workload {
    /// Start `workers` threads that repeatedly add random deltas to `handles`.
    ///
    /// Time spent per iteration is added to `busy`.
    pub fn spawn(workers: usize, handles: Vec<MetricHandle>, busy: Arc<Metric<f64>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handles = Arc::new(handles);

        let threads = (0..workers)
            .map(|id| {
                let stop = Arc::clone(&stop);
                let handles = Arc::clone(&handles);
                let busy = Arc::clone(&busy);
                thread::Builder::new()
                    .name(format!("tally-worker-{}", id))
                    .spawn(move || {
                        let mut rng = rand::thread_rng();
                        let mut iterations = 0u64;
                        while !stop.load(Ordering::Relaxed) {
                            timed!(busy, {
                                for handle in handles.iter() {
                                    handle.bump(&mut rng);
                                }
                            });
                            iterations += 1;
                            thread::sleep(ITERATION_PAUSE);
                        }
                        iterations
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("failed to spawn workload thread: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(workers = threads.len(), "workload started");
        Self { stop, threads }
    }

    /// Number of running threads
    pub fn workers(&self) -> usize {
        self.threads.len()
    }

    /// Signal every thread to stop and wait for them; returns total iterations.
    pub fn stop(self) -> u64 {
        self.stop.store(true, Ordering::Relaxed);
        let mut total = 0;
        for handle in self.threads {
            match handle.join() {
                Ok(n) => total += n,
                Err(_) => tracing::warn!("workload thread panicked"),
            }
        }
        tracing::info!(iterations = total, "workload stopped");
        total
    }
}
