//! Per-request execution context.
//!
//! # Responsibilities
//! - Hold the request, the write-once response writer and the middleware cursor
//! - Carry path parameters and a free-form data bag between middlewares
//! - Write the JSON envelope for success and failure outcomes
//!
//! # Design Decisions
//! - Contexts are pooled; `reset` clears every per-request field
//! - One request owns a context between acquire and release; no sharing

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorKind, HttpError};
use crate::http::envelope::{Envelope, INTERNAL_ERROR_MESSAGE, JSON_CONTENT_TYPE};
use crate::http::stack::Stack;
use crate::http::writer::ResponseWriter;
use crate::routing::Params;
use crate::session::Session;

/// Data bag key holding the caught `Fault` while the panic handler runs.
pub const PANIC_KEY: &str = "panic";
/// Data bag key holding the controller name resolved by the route table.
pub const CONTROLLER_KEY: &str = "controller";
/// Data bag key holding the loaded `Session`.
pub const SESSION_KEY: &str = "session";
/// Data bag key holding the session id.
pub const SID_KEY: &str = "sid";

/// Cursor value before the first middleware runs.
pub const CURSOR_START: isize = -1;

pub struct Context {
    writer: ResponseWriter,
    request: Request<Bytes>,
    cursor: isize,
    params: Params,
    data: HashMap<String, Box<dyn Any + Send>>,
    stack: Arc<Stack>,
}

impl Context {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self {
            writer: ResponseWriter::new(),
            request: Request::default(),
            cursor: CURSOR_START,
            params: Params::new(),
            data: HashMap::new(),
            stack,
        }
    }

    /// Attach a request and a fresh writer.
    pub(crate) fn bind(&mut self, writer: ResponseWriter, request: Request<Bytes>) {
        self.reset();
        self.writer = writer;
        self.request = request;
    }

    /// Drop everything tied to the current request.
    pub(crate) fn reset(&mut self) {
        // Replacing the request drops its body.
        self.request = Request::default();
        self.writer = ResponseWriter::new();
        self.params.clear();
        self.data.clear();
        self.cursor = CURSOR_START;
    }

    // ---- middleware chain -------------------------------------------------

    /// Run the next middleware, unless the response is written or the stack
    /// is exhausted.
    pub fn next(&mut self) {
        if self.written() {
            return;
        }
        let Ok(index) = usize::try_from(self.cursor + 1) else {
            return;
        };
        let Some(middleware) = self.stack.middleware(index).cloned() else {
            return;
        };
        self.cursor += 1;
        middleware.handle(self);
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    // ---- request ----------------------------------------------------------

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Parse the body as JSON, or as a urlencoded form into an object of
    /// strings. An empty JSON body yields `null`.
    pub fn body_json(&self) -> Result<Value, HttpError> {
        let content_type = self
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let mime = content_type.split(';').next().unwrap_or("").trim();

        if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            let form = url::form_urlencoded::parse(self.body())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            return Ok(Value::Object(form));
        }
        if self.body().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(self.body())
            .map_err(|e| HttpError::validation(format!("malformed JSON body: {e}")))
    }

    // ---- params -----------------------------------------------------------

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    // ---- data bag ---------------------------------------------------------

    pub fn insert_data<T: Any + Send>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Option<Box<dyn Any + Send>> {
        self.data.insert(key.into(), Box::new(value))
    }

    pub fn data<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn data_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.data.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn remove_data(&mut self, key: &str) -> Option<Box<dyn Any + Send>> {
        self.data.remove(key)
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Session loaded by the session middleware.
    pub fn session(&self) -> Option<&Session> {
        self.data(SESSION_KEY)
    }

    // ---- response ---------------------------------------------------------

    pub fn written(&self) -> bool {
        self.writer.is_written()
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Take the written response, leaving an empty writer behind.
    pub(crate) fn take_response(&mut self) -> Response<Body> {
        std::mem::take(&mut self.writer).into_response()
    }

    /// Write the success envelope with status 200.
    pub fn ok<T: Serialize>(&mut self, data: T) -> bool {
        if self.written() {
            tracing::warn!(path = %self.path(), "Context.ok: response already written");
            return false;
        }
        match serde_json::to_vec(&Envelope::success(data)) {
            Ok(body) => self.write_json(StatusCode::OK, body),
            Err(e) => self.fail(&HttpError::from(e)),
        }
    }

    /// Write the failure envelope; the status follows the error kind.
    pub fn fail(&mut self, err: &HttpError) -> bool {
        if self.written() {
            tracing::warn!(
                path = %self.path(),
                error = %err,
                "Context.fail: response already written"
            );
            return false;
        }

        let settings = self.stack.settings();
        let is_server = err.kind() == ErrorKind::Server;
        if !settings.production || is_server {
            tracing::warn!(
                path = %self.path(),
                kind = ?err.kind(),
                errno = err.errno(),
                error = %err,
                "Request failed"
            );
        }

        let message = if settings.production && is_server {
            INTERNAL_ERROR_MESSAGE
        } else {
            err.message()
        };
        let status = err.kind().status(settings.business_status);
        match serde_json::to_vec(&Envelope::failure(message, err.errno())) {
            Ok(body) => self.write_json(status, body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode failure envelope");
                self.writer.write_status(status)
            }
        }
    }

    /// Write an arbitrary JSON body with status 200, without the envelope.
    pub fn respond_json<T: Serialize>(&mut self, value: &T) -> bool {
        if self.written() {
            tracing::warn!(path = %self.path(), "Context.respond_json: response already written");
            return false;
        }
        match serde_json::to_vec(value) {
            Ok(body) => self.write_json(StatusCode::OK, body),
            Err(e) => self.fail(&HttpError::from(e)),
        }
    }

    /// Write a bare status with its canonical reason as body.
    pub fn respond_status(&mut self, status: StatusCode) -> bool {
        if self.written() {
            tracing::warn!(path = %self.path(), "Context.respond_status: response already written");
            return false;
        }
        if let Some(headers) = self.writer.headers_mut() {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        let reason = status.canonical_reason().unwrap_or("");
        self.writer.write(status, reason)
    }

    fn write_json(&mut self, status: StatusCode, body: Vec<u8>) -> bool {
        if let Some(headers) = self.writer.headers_mut() {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        self.writer.write(status, body)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.method())
            .field("path", &self.path())
            .field("cursor", &self.cursor)
            .field("written", &self.written())
            .field("params", &self.params)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}
