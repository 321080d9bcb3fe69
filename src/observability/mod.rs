//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / WebSocket engine produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is a field on every dispatch event
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
