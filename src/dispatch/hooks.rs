//! Host-overridable statistics and error hooks.

use std::error::Error;

use uuid::Uuid;

use crate::dispatch::RequestStats;
use crate::observability::metrics;

/// Receives one record per request.
///
/// Called on the dispatching task after the response is final; keep it cheap.
pub trait StatsSink: Send + Sync + 'static {
    fn record(&self, stats: &RequestStats);
}

/// Where a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOrigin {
    Filter { pattern: String },
    Endpoint { pattern: String },
    WebSocket { sub_path: String },
}

/// An uncaught handler, filter or message-handler failure.
#[derive(Debug)]
pub struct ErrorReport<'a> {
    pub request_id: Uuid,
    pub origin: FailureOrigin,
    pub error: &'a (dyn Error + Send + Sync + 'static),
}

/// Receives uncaught failures. Cannot influence the response.
pub trait ErrorSink: Send + Sync + 'static {
    fn report(&self, report: &ErrorReport<'_>);
}

/// Default statistics sink: metrics plus a debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsStatsSink;

impl StatsSink for MetricsStatsSink {
    fn record(&self, stats: &RequestStats) {
        metrics::record_request(stats);
        tracing::debug!(
            request_id = %stats.request_id,
            method = %stats.method,
            path = %stats.path,
            endpoint = %stats.endpoint,
            status = stats.status,
            filters = stats.filters.len(),
            duration_us = stats.duration.as_micros() as u64,
            "Request dispatched"
        );
    }
}

/// Default error sink: one error event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: &ErrorReport<'_>) {
        tracing::error!(
            request_id = %report.request_id,
            origin = ?report.origin,
            error = %report.error,
            "Uncaught failure"
        );
    }
}

/// A panic caught inside a handler, filter or message handler.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {0}")]
pub struct Panicked(pub String);

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self(message)
    }
}
