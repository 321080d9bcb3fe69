//! Conversion of dispatch results into axum responses.

use axum::body::Body;
use axum::http::HeaderValue;
use uuid::Uuid;

use crate::dispatch::ResponseParts;
use crate::http::X_REQUEST_ID;

pub fn into_axum(parts: ResponseParts, request_id: Uuid) -> axum::response::Response {
    let mut response = axum::response::Response::new(Body::from(parts.body));
    *response.status_mut() = parts.status;
    *response.headers_mut() = parts.headers;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn carries_status_headers_and_request_id() {
        let mut parts = ResponseParts::default();
        parts.status = StatusCode::CREATED;
        parts
            .headers
            .insert("x-custom", HeaderValue::from_static("yes"));
        parts.body = b"done".to_vec();

        let id = Uuid::new_v4();
        let response = into_axum(parts, id);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-custom"], "yes");
        assert_eq!(response.headers()["x-request-id"], id.to_string().as_str());
    }
}
