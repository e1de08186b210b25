//! Write-once response writer.
//!
//! Whatever layer writes first (handler, middleware, panic handler or the
//! default error path) commits the response. Every later write is dropped and
//! reported to the caller as `false`.

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};

/// Buffered response with a write-once guard.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a status line or body has been committed.
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Status of the committed response.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Response headers, available until the response is committed.
    pub fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        if self.is_written() {
            tracing::warn!("Response already written; header change dropped");
            return None;
        }
        Some(&mut self.headers)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Commit a status line without a body.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        self.write(status, Vec::new())
    }

    /// Commit a full response.
    pub fn write(&mut self, status: StatusCode, body: impl Into<Vec<u8>>) -> bool {
        if let Some(committed) = self.status {
            tracing::warn!(
                committed = %committed,
                attempted = %status,
                "Response already written; write suppressed"
            );
            return false;
        }
        self.status = Some(status);
        self.body = body.into();
        true
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convert into an HTTP response. Nothing written means an empty 200.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_second_write_suppressed() {
        let mut writer = ResponseWriter::new();
        assert!(!writer.is_written());

        assert!(writer.write(StatusCode::CREATED, "first"));
        assert!(writer.is_written());
        assert!(!writer.write(StatusCode::INTERNAL_SERVER_ERROR, "second"));
        assert!(!writer.write_status(StatusCode::NOT_FOUND));

        assert_eq!(writer.status(), Some(StatusCode::CREATED));
        assert_eq!(writer.body(), b"first");
    }

    #[test]
    fn test_headers_frozen_after_write() {
        let mut writer = ResponseWriter::new();
        writer
            .headers_mut()
            .unwrap()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        writer.write_status(StatusCode::NO_CONTENT);
        assert!(writer.headers_mut().is_none());

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_unwritten_response_is_empty_ok() {
        let response = ResponseWriter::new().into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
