//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): requests by method, endpoint, status
//! - `switchyard_request_duration_seconds` (histogram): total dispatch latency
//! - `switchyard_endpoint_duration_seconds` (histogram): endpoint-only latency
//! - `switchyard_filter_results_total` (counter): filter outcomes by pattern
//! - `switchyard_ws_connections` (gauge): open WebSocket connections
//! - `switchyard_ws_frames_total` (counter): frames by direction

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::RequestStats;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> bool {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint listening");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
            false
        }
    }
}

/// Forward one dispatch record.
pub fn record_request(stats: &RequestStats) {
    counter!(
        "switchyard_requests_total",
        "method" => stats.method.clone(),
        "endpoint" => stats.endpoint.clone(),
        "status" => stats.status.to_string()
    )
    .increment(1);
    histogram!(
        "switchyard_request_duration_seconds",
        "endpoint" => stats.endpoint.clone()
    )
    .record(stats.duration.as_secs_f64());

    if let Some(duration) = stats.endpoint_duration {
        histogram!(
            "switchyard_endpoint_duration_seconds",
            "endpoint" => stats.endpoint.clone()
        )
        .record(duration.as_secs_f64());
    }

    for filter in &stats.filters {
        counter!(
            "switchyard_filter_results_total",
            "filter" => filter.path.clone(),
            "result" => filter.result.as_str()
        )
        .increment(1);
    }
}

/// Adjust the open WebSocket connection gauge by `delta`.
pub fn record_ws_connection(delta: f64) {
    gauge!("switchyard_ws_connections").increment(delta);
}

/// Count one frame; `direction` is "in" or "out".
pub fn record_ws_frame(direction: &'static str) {
    counter!("switchyard_ws_frames_total", "direction" => direction).increment(1);
}
