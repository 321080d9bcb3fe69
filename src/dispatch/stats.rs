//! Per-request statistics records.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// Endpoint label used when no route matched.
pub const UNMATCHED: &str = "unmatched";

/// How a filter finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterResult {
    /// Returned Continue or Stop.
    Ok,
    /// Returned an error.
    Exception,
    /// Panicked.
    ServerException,
}

impl FilterResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterResult::Ok => "ok",
            FilterResult::Exception => "exception",
            FilterResult::ServerException => "server-exception",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterStats {
    /// Anchored filter pattern.
    pub path: String,
    pub result: FilterResult,
    pub duration: Duration,
}

/// One record per dispatched request, emitted whatever the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub request_id: Uuid,
    pub method: String,
    pub path: String,
    /// Matched route pattern or "unmatched".
    pub endpoint: String,
    pub duration: Duration,
    /// Time spent in the endpoint; `None` if it never ran.
    pub endpoint_duration: Option<Duration>,
    pub filters: Vec<FilterStats>,
    pub status: u16,
}

impl RequestStats {
    pub fn new(request_id: Uuid, method: &str, path: &str) -> Self {
        Self {
            request_id,
            method: method.to_string(),
            path: path.to_string(),
            endpoint: UNMATCHED.to_string(),
            duration: Duration::ZERO,
            endpoint_duration: None,
            filters: Vec::new(),
            status: 0,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.endpoint != UNMATCHED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_filter_results_in_kebab_case() {
        let mut stats = RequestStats::new(Uuid::nil(), "GET", "/x");
        stats.filters.push(FilterStats {
            path: "^/x$".into(),
            result: FilterResult::ServerException,
            duration: Duration::from_millis(1),
        });
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["endpoint"], "unmatched");
        assert_eq!(json["filters"][0]["result"], "server-exception");
        assert!(!stats.is_matched());
    }
}
