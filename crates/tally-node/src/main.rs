//! Tally reporter binary
//!
//! Registers a metric set, drives it with a synthetic workload, and drains it
//! into a snapshot log on a fixed interval.

mod cli;
mod config;
mod reporter;
mod workload;

use anyhow::{Context, Result};
use cli::Cli;
use config::{load_metrics_file, MetricsConfig, ReporterConfig};
use reporter::Reporter;
use std::sync::Arc;
use std::time::Duration;
use tally_metrics::{FileSink, MetricRegistry};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workload::{register_all, Workload, BUSY_METRIC};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Tally reporter starting...");

    // Load metric set
    let metrics_config = if let Some(path) = &cli.config {
        load_metrics_file(path)?
    } else {
        MetricsConfig::default()
    };

    let config = ReporterConfig {
        output: cli.output,
        interval: Duration::from_millis(cli.interval_ms.max(1)),
        truncate: cli.truncate,
        duration: cli.duration_secs.map(Duration::from_secs),
        workers: cli.workers,
    };

    // Registry and handles
    let registry = Arc::new(MetricRegistry::new());
    let handles = register_all(&registry, &metrics_config);
    let busy = registry.create_metric::<f64>(BUSY_METRIC);
    tracing::info!(metrics = registry.len(), "metrics registered");

    // Output sink
    let sink = if config.truncate {
        FileSink::truncate(&config.output)
    } else {
        FileSink::append(&config.output)
    }
    .with_context(|| format!("failed to open output {}", config.output.display()))?;
    tracing::info!(output = %config.output.display(), "writing snapshots");

    // Start reporter
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reporter = Reporter::new(Arc::clone(&registry), sink, config.interval);
    let reporter_task = tokio::spawn(reporter.run(shutdown_rx));

    let workload = Workload::spawn(config.workers, handles, busy);

    // Wait for Ctrl+C or the configured duration
    match config.duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    tracing::info!("Run duration elapsed");
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
            tracing::info!("Shutdown signal received");
        }
    }

    // Stop producers before the final drain so nothing is left behind
    let iterations = tokio::task::spawn_blocking(move || workload.stop())
        .await
        .context("workload shutdown failed")?;
    shutdown_tx.send(true).ok();

    let (mut sink, stats) = reporter_task.await.context("reporter task failed")?;
    sink.close().context("failed to flush output")?;

    tracing::info!(
        iterations,
        lines = stats.written,
        failed = stats.failed,
        "Tally reporter stopped"
    );
    Ok(())
}
