//! Configuration types for the tally reporter

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_metrics::{validate_name, MetricKind};

/// Reporter configuration
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Snapshot log path
    pub output: PathBuf,
    /// Time between drains
    pub interval: Duration,
    /// Truncate `output` on startup instead of appending
    pub truncate: bool,
    /// Stop after this long; `None` runs until interrupted
    pub duration: Option<Duration>,
    /// Workload thread count
    pub workers: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("./metrics.log"),
            interval: Duration::from_secs(1),
            truncate: false,
            duration: None,
            workers: 4,
        }
    }
}

/// Metric set definition, loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metrics in registration order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricSpec>,
}

/// One metric to register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Metric name
    pub name: String,
    /// Integer or float
    #[serde(default = "default_kind")]
    pub kind: MetricKind,
    /// Starting value
    #[serde(default)]
    pub initial: f64,
}

fn default_kind() -> MetricKind {
    MetricKind::Integer
}

fn default_metrics() -> Vec<MetricSpec> {
    vec![
        MetricSpec {
            name: "requests".to_string(),
            kind: MetricKind::Integer,
            initial: 0.0,
        },
        MetricSpec {
            name: "bytes_in".to_string(),
            kind: MetricKind::Integer,
            initial: 0.0,
        },
        MetricSpec {
            name: "latency_ms".to_string(),
            kind: MetricKind::Float,
            initial: 0.0,
        },
    ]
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
        }
    }
}

impl MetricsConfig {
    /// Check every entry can be registered and rendered.
    ///
    /// Duplicate names are allowed (they become duplicate fields) but logged.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.metrics {
            validate_name(&spec.name)?;
            if !spec.initial.is_finite() {
                bail!("metric {:?}: initial value must be finite", spec.name);
            }
            if spec.kind == MetricKind::Integer {
                if spec.initial.fract() != 0.0 {
                    bail!(
                        "metric {:?}: integer metric has fractional initial value {}",
                        spec.name,
                        spec.initial
                    );
                }
                if spec.initial < i64::MIN as f64 || spec.initial >= i64::MAX as f64 {
                    bail!("metric {:?}: initial value out of range", spec.name);
                }
            }
            if !seen.insert(spec.name.as_str()) {
                tracing::warn!(name = %spec.name, "duplicate metric name, it will appear twice per line");
            }
        }
        Ok(())
    }
}

/// Load and validate a metric set from a JSON file
pub fn load_metrics_file(path: &Path) -> Result<MetricsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metrics config {}", path.display()))?;
    let config: MetricsConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse metrics config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
