//! Observability module for centralized logging and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics collection with a Prometheus recorder
//! - Spans and recording helpers used by the preprocessing code

use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize logging and, when enabled, the metrics recorder.
///
/// Returns the Prometheus handle so the caller can render a snapshot.
pub fn init_observability(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing(config)?;

    let handle = if config.enable_metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    tracing::info!(
        environment = %config.environment,
        metrics_enabled = %config.enable_metrics,
        "Observability stack initialized successfully"
    );
    Ok(handle)
}

/// Initialize tracing subscriber with environment-based filtering
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("ocr_prep={}", config.log_level.to_ascii_lowercase()).parse()?);

    if config.use_pretty_logs() {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        // JSON formatting for production
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with a Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Write the rendered metrics snapshot to `path`
pub fn dump_metrics(handle: &PrometheusHandle, path: &str) -> Result<()> {
    std::fs::write(path, handle.render())?;
    tracing::debug!(path = %path, "Metrics snapshot written");
    Ok(())
}

/// Create a span for preprocessing operations
pub fn preprocessing_span(operation: &str) -> tracing::Span {
    tracing::info_span!(
        "preprocessing_operation",
        operation = operation,
        component = "preprocessing"
    )
}

/// Record binarization metrics
pub fn record_binarize_metrics(threshold: u8, pixel_count: u64, duration: Duration) {
    metrics::counter!("binarize_operations_total").increment(1);
    metrics::histogram!("binarize_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("binarize_threshold").record(threshold as f64);
    metrics::histogram!("binarize_pixels").record(pixel_count as f64);
}

/// Record crop extraction metrics
pub fn record_crop_metrics(success: bool, duration: Duration) {
    metrics::counter!("crop_operations_total", "result" => if success { "success" } else { "invalid_region" }).increment(1);
    metrics::histogram!("crop_duration_seconds").record(duration.as_secs_f64());
}

/// Record content auto-detection metrics
pub fn record_auto_detect(found: bool, duration: Duration) {
    metrics::counter!("auto_detect_total", "result" => if found { "found" } else { "empty" }).increment(1);
    metrics::histogram!("auto_detect_duration_seconds").record(duration.as_secs_f64());
}

/// Record pipeline page metrics
pub fn record_page_metrics(success: bool, duration: Duration) {
    metrics::counter!("pages_prepared_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("page_duration_seconds").record(duration.as_secs_f64());
}
