//! Conversion of inbound axum requests.

use axum::http::HeaderName;
use thiserror::Error;

use crate::dispatch::Request;

/// Response header carrying the dispatch request id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Error)]
#[error("request body exceeds {limit} bytes")]
pub struct BodyTooLarge {
    pub limit: usize,
}

/// Buffer the body (at most `max_body` bytes) and build a dispatch request.
pub async fn from_axum(request: axum::extract::Request, max_body: usize) -> Result<Request, BodyTooLarge> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body).await.map_err(|e| {
        tracing::debug!(error = %e, limit = max_body, "Request body rejected");
        BodyTooLarge { limit: max_body }
    })?;

    Ok(Request {
        method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    })
}
