//! Response sink shared between filters and the endpoint of one request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};

/// Status, headers and body written so far.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

/// Cloneable handle to the response of one request.
///
/// Every filter and the endpoint receive a clone pointing at the same parts.
/// The host transport turns the final parts into bytes on the wire.
#[derive(Debug, Clone, Default)]
pub struct Response {
    inner: Arc<Mutex<ResponseParts>>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseParts> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        self.lock().headers.get(name).cloned()
    }

    /// Append bytes to the body.
    pub fn write(&self, bytes: impl AsRef<[u8]>) {
        self.lock().body.extend_from_slice(bytes.as_ref());
    }

    /// Throw away everything written so far and replace it with a plain-text
    /// response.
    pub fn reset(&self, status: StatusCode, body: &str) {
        let mut parts = self.lock();
        *parts = ResponseParts::default();
        parts.status = status;
        parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        parts.body.extend_from_slice(body.as_bytes());
    }

    /// Copy of the current parts.
    pub fn snapshot(&self) -> ResponseParts {
        self.lock().clone()
    }

    /// Move the parts out, leaving an empty 200 behind.
    pub fn take(&self) -> ResponseParts {
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_parts() {
        let response = Response::new();
        let other = response.clone();
        other.set_status(StatusCode::CREATED);
        other.write("a");
        response.write(b"b");

        let parts = response.snapshot();
        assert_eq!(parts.status, StatusCode::CREATED);
        assert_eq!(parts.body, b"ab");
    }

    #[test]
    fn reset_discards_partial_output() {
        let response = Response::new();
        response.write("secret partial output");
        response.insert_header(HeaderName::from_static("x-debug"), HeaderValue::from_static("1"));

        response.reset(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        let parts = response.take();
        assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(parts.body, b"Internal Server Error");
        assert!(parts.headers.get("x-debug").is_none());

        assert_eq!(response.status(), StatusCode::OK);
    }
}
