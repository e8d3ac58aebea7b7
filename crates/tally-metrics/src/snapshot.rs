//! Drained snapshots and their renderings

use crate::metric::MetricKind;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Timestamp layout used at the head of every snapshot line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One metric's drained value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotField {
    /// Metric name
    pub name: String,
    /// Formatting family of `value`
    pub kind: MetricKind,
    /// Value observed at reset, already formatted for its kind
    pub value: String,
}

/// Every registered metric's value at one drain, in registration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Wall-clock time captured once for the whole drain
    pub timestamp: DateTime<Local>,
    /// Drained values
    pub fields: Vec<SnapshotField>,
}

impl Snapshot {
    /// Timestamp as `YYYY-MM-DD HH:MM:SS.mmm`
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Render the snapshot line, newline included:
    ///
    /// ```text
    /// 2024-01-02 03:04:05.006 "requests" 15 "latency_ms" 2.500
    /// ```
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(24 + self.fields.len() * 24);
        let _ = write!(line, "{}", self.timestamp.format(TIMESTAMP_FORMAT));
        for field in &self.fields {
            let _ = write!(line, " \"{}\" {}", field.name, field.value);
        }
        line.push('\n');
        line
    }

    /// Look up a drained value by name (first match)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Number of drained metrics
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry was empty at drain time
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Export snapshot as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export snapshot as compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
