//! Fully buffered inbound request handed over by the host transport.

use axum::body::Bytes;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::HeaderMap;

/// An inbound request.
///
/// The method is kept as the raw token so that methods unknown to the route
/// table can still be answered with "method not allowed".
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a (possibly repeated) header.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn repeated_headers_are_kept() {
        let request = Request::new("GET", "/")
            .with_header(header::ACCEPT, HeaderValue::from_static("text/plain"))
            .with_header(header::ACCEPT, HeaderValue::from_static("text/html"))
            .with_body("hello");

        assert_eq!(request.header("accept"), Some("text/plain"));
        assert_eq!(request.header_all("accept"), vec!["text/plain", "text/html"]);
        assert_eq!(request.body_text(), Some("hello"));
        assert!(request.query.is_none());
    }
}
