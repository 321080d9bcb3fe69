//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use switchyard::dispatch::{
    ErrorReport, ErrorSink, FailureOrigin, RequestStats, ResponseParts, StatsSink,
};
use switchyard::{Engine, EngineConfig, Request, Response, Server};

/// Stats and error sink that keeps everything it receives.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    stats: Arc<Mutex<Vec<RequestStats>>>,
    errors: Arc<Mutex<Vec<(FailureOrigin, String)>>>,
}

impl Recorder {
    pub fn stats(&self) -> Vec<RequestStats> {
        self.stats.lock().unwrap().clone()
    }

    pub fn last_stats(&self) -> RequestStats {
        self.stats().pop().expect("no stats recorded")
    }

    pub fn errors(&self) -> Vec<(FailureOrigin, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl StatsSink for Recorder {
    fn record(&self, stats: &RequestStats) {
        self.stats.lock().unwrap().push(stats.clone());
    }
}

impl ErrorSink for Recorder {
    fn report(&self, report: &ErrorReport<'_>) {
        self.errors
            .lock()
            .unwrap()
            .push((report.origin.clone(), report.error.to_string()));
    }
}

/// A server with default config whose hooks feed `recorder`.
pub fn recorded_server(recorder: &Recorder) -> Server {
    let mut server = Server::new(EngineConfig::default());
    server.stats_sink(recorder.clone()).unwrap();
    server.error_sink(recorder.clone()).unwrap();
    server
}

/// Dispatch a body-less request and return the final response parts.
pub async fn call(engine: &Engine, method: &str, path: &str) -> ResponseParts {
    let response = Response::new();
    engine.dispatch(Request::new(method, path), response.clone()).await;
    response.take()
}

pub fn body(parts: &ResponseParts) -> &str {
    std::str::from_utf8(&parts.body).unwrap()
}
