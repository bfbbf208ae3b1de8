//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use crate::models::ConversionKind;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// Must be called once at startup before any metrics are recorded. Later
/// calls are ignored.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_conversion_started(kind: ConversionKind) {
    metrics::counter!("conversion_requests_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_conversion_finished(kind: ConversionKind, elapsed: Duration, success: bool) {
    if !success {
        metrics::counter!("conversion_failures_total", "kind" => kind.as_str()).increment(1);
    }
    metrics::histogram!("conversion_duration_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());
}
