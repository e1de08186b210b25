//! JSON response envelope.
//!
//! ```text
//! success: {"ok":true,"data":<value>,"message":""}
//! failure: {"ok":false,"data":null,"message":"<text>","errno":<int>}
//! ```

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

use crate::app::default_headers;
use crate::error::HttpError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Generic message sent for server faults in production mode.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i64>,
}

impl<T: Serialize> Envelope<'static, T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            message: "",
            errno: None,
        }
    }
}

impl<'a> Envelope<'a, ()> {
    pub fn failure(message: &'a str, errno: i64) -> Self {
        Self {
            ok: false,
            data: None,
            message,
            errno: Some(errno),
        }
    }
}

/// Failure envelope as a standalone response, for errors raised before a
/// request context exists. Carries the same default headers as dispatched
/// responses.
pub fn failure_response(err: &HttpError, business_status: StatusCode) -> Response<Body> {
    let status = err.kind().status(business_status);
    let body = serde_json::to_vec(&Envelope::failure(err.message(), err.errno()))
        .unwrap_or_default();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.extend(default_headers());
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_format() {
        let body = serde_json::to_string(&Envelope::success(json!({"id": "42"}))).unwrap();
        assert_eq!(body, r#"{"ok":true,"data":{"id":"42"},"message":""}"#);
    }

    #[test]
    fn test_failure_wire_format() {
        let body = serde_json::to_string(&Envelope::failure("Controller not found", 0)).unwrap();
        assert_eq!(
            body,
            r#"{"ok":false,"data":null,"message":"Controller not found","errno":0}"#
        );
    }

    #[test]
    fn test_failure_response_status() {
        let response = failure_response(
            &HttpError::business(7, "quota exceeded"),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_failure_response_has_default_headers() {
        let response = failure_response(&HttpError::server("boom"), StatusCode::BAD_REQUEST);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::VARY], "Accept-Encoding");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "X-Requested-With");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "PUT,POST,GET,DELETE,OPTIONS"
        );
        assert_eq!(headers.get_all(header::CONTENT_TYPE).iter().count(), 1);
    }
}
