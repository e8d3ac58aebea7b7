//! CLI argument parsing for the tally reporter

use clap::Parser;
use std::path::PathBuf;

/// Periodic metrics reporter with a synthetic workload
#[derive(Parser, Debug, Clone)]
#[command(name = "tally")]
#[command(about = "Drain in-process metrics into a timestamped log")]
#[command(version)]
pub struct Cli {
    /// Metric set definition (JSON); uses a built-in set if not specified
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// File that receives one snapshot line per interval
    #[arg(long, default_value = "./metrics.log")]
    pub output: PathBuf,

    /// Drain interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Stop after this many seconds (runs until Ctrl+C if not specified)
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Number of workload threads updating the metrics
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Truncate the output file instead of appending to it
    #[arg(long)]
    pub truncate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
