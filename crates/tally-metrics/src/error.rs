//! Metrics error types

use std::io;
use thiserror::Error;

/// Metrics errors
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The sink accepted the drain but the write itself failed
    #[error("sink write failed: {0}")]
    Sink(#[from] io::Error),

    /// Metric name cannot be carried by the snapshot line format
    #[error("invalid metric name {0:?}: {1}")]
    InvalidName(String, &'static str),
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Check that a name survives the snapshot line format unescaped.
///
/// The registry itself never rejects a name; this is for callers that build
/// metric sets from untrusted configuration.
pub fn validate_name(name: &str) -> MetricsResult<()> {
    if name.is_empty() {
        return Err(MetricsError::InvalidName(name.to_string(), "name is empty"));
    }
    if name.contains('"') {
        return Err(MetricsError::InvalidName(
            name.to_string(),
            "name contains a double quote",
        ));
    }
    if name.contains(['\n', '\r']) {
        return Err(MetricsError::InvalidName(
            name.to_string(),
            "name contains a line break",
        ));
    }
    Ok(())
}
