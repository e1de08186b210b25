//! Request logging middleware.
//!
//! Runs the rest of the chain, then logs method, path, status and latency
//! and records the request metrics. Register it first so the latency covers
//! every later middleware.

use std::time::Instant;

use axum::http::StatusCode;

use crate::http::stack::Middleware;
use crate::http::Context;
use crate::observability::metrics;

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogger;

impl RequestLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogger {
    fn handle(&self, ctx: &mut Context) {
        let start = Instant::now();
        ctx.next();

        let status = ctx.writer().status().unwrap_or(StatusCode::OK);
        tracing::info!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Request handled"
        );
        metrics::record_request(ctx.method().as_str(), status.as_u16(), start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stack::{self, Stack};
    use crate::http::writer::ResponseWriter;
    use axum::body::Bytes;
    use axum::http::Request;
    use std::sync::Arc;

    #[test]
    fn test_logger_continues_chain() {
        let mut stack = Stack::new();
        stack.use_middleware(RequestLogger::new());
        stack.use_middleware(|ctx: &mut Context| {
            ctx.respond_status(StatusCode::NO_CONTENT);
        });
        let mut ctx = Context::new(Arc::new(stack));
        ctx.bind(ResponseWriter::new(), Request::new(Bytes::new()));
        stack::run(&mut ctx);
        assert_eq!(ctx.writer().status(), Some(StatusCode::NO_CONTENT));
        assert_eq!(ctx.cursor(), 1);
    }
}
