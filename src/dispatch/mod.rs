//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Host transport (method, path, headers, body) + Response sink
//!     → dispatcher.rs (method lookup → 405, first matching route → 404)
//!     → context.rs (params, attributes, fresh request-scoped cache)
//!     → filter chain: ALL filters, then method filters, in registration order
//!         Continue → next filter
//!         Stop     → done, the filter wrote the response
//!         Err/panic → 500 + error sink
//!     → endpoint handler (Err/panic → 500 + error sink)
//!     → stats.rs (one RequestStats record per request, always)
//! ```
//!
//! # Design Decisions
//! - Route match happens before any filter runs; a 404 never counts filters
//! - Filters of one request run strictly one after another
//! - Failure details go to the error sink, never into the response body

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod hooks;
pub mod request;
pub mod response;
pub mod stats;

pub use context::Context;
pub use dispatcher::{DispatchOutcome, Dispatched, Dispatcher};
pub use handler::{BoxError, Filter, Flow, Handler};
pub use hooks::{
    ErrorReport, ErrorSink, FailureOrigin, MetricsStatsSink, Panicked, StatsSink, TracingErrorSink,
};
pub use request::Request;
pub use response::{Response, ResponseParts};
pub use stats::{FilterResult, FilterStats, RequestStats};
