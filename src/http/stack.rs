//! Middleware stack and fault recovery.
//!
//! # Responsibilities
//! - Hold the ordered middleware list and the optional panic handler
//! - Drive one request through the chain inside a fault boundary
//! - Turn a fault into a response: validation faults become 400, the rest go
//!   through the panic handler or fall back to a generic 500
//!
//! # Design Decisions
//! - Middlewares are synchronous and call `ctx.next()` to continue
//! - The stack is frozen once the app is built and shared via `Arc`

use std::fmt;
use std::sync::Arc;

use axum::http::{header, StatusCode};

use crate::config::ResponseConfig;
use crate::error::{ErrorKind, HttpError};
use crate::http::context::{Context, PANIC_KEY};
use crate::http::envelope::INTERNAL_ERROR_MESSAGE;
use crate::http::fault::{self, Fault};

/// A unit of request processing.
///
/// Call `ctx.next()` to hand control to the following middleware. Writing a
/// response stops the chain.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Middleware for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// Response behaviour shared by every context of a stack.
#[derive(Debug, Clone)]
pub struct StackSettings {
    /// Status used for business failures.
    pub business_status: StatusCode,
    /// Hide server failure detail and skip logging non-server failures.
    pub production: bool,
    /// Upper bound in bytes for logged fault traces.
    pub stack_trace_limit: usize,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self::from(&ResponseConfig::default())
    }
}

impl From<&ResponseConfig> for StackSettings {
    fn from(config: &ResponseConfig) -> Self {
        Self {
            business_status: StatusCode::from_u16(config.business_status)
                .unwrap_or(StatusCode::BAD_REQUEST),
            production: config.production,
            stack_trace_limit: config.stack_trace_limit,
        }
    }
}

#[derive(Default)]
pub struct Stack {
    middlewares: Vec<Arc<dyn Middleware>>,
    panic_handler: Option<Arc<dyn Middleware>>,
    settings: StackSettings,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: StackSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Append a middleware. Order of calls is order of execution.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn use_arc(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Install the handler run after an unexpected fault. It finds the
    /// `Fault` in the data bag under `PANIC_KEY`.
    pub fn handle_panic<M: Middleware>(&mut self, handler: M) -> &mut Self {
        self.panic_handler = Some(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub(crate) fn middleware(&self, index: usize) -> Option<&Arc<dyn Middleware>> {
        self.middlewares.get(index)
    }

    pub fn panic_handler(&self) -> Option<&Arc<dyn Middleware>> {
        self.panic_handler.as_ref()
    }

    pub fn settings(&self) -> &StackSettings {
        &self.settings
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("middlewares", &self.middlewares.len())
            .field("panic_handler", &self.panic_handler.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Run the bound request through the stack of `ctx`.
pub fn run(ctx: &mut Context) {
    if let Err(fault) = fault::catch(|| ctx.next()) {
        recover(ctx, fault);
    }
}

fn recover(ctx: &mut Context, fault: Fault) {
    if let Some(err) = fault.http_error() {
        if err.kind() == ErrorKind::Validation {
            let err = err.clone();
            ctx.fail(&err);
            return;
        }
    }

    let limit = ctx.stack().settings().stack_trace_limit;
    tracing::error!(
        method = %ctx.method(),
        path = %ctx.path(),
        message = %fault.message(),
        trace = %fault.bounded_trace(limit),
        "Request fault"
    );

    if ctx.written() {
        return;
    }

    if let Some(headers) = ctx.writer_mut().headers_mut() {
        headers.remove(header::CONTENT_TYPE);
    }

    if let Some(handler) = ctx.stack().panic_handler().cloned() {
        ctx.insert_data(PANIC_KEY, fault);
        if let Err(second) = fault::catch(|| handler.handle(ctx)) {
            tracing::error!(
                path = %ctx.path(),
                message = %second.message(),
                "Panic handler faulted"
            );
        }
    }

    if !ctx.written() {
        ctx.fail(&HttpError::server(INTERNAL_ERROR_MESSAGE));
    }
}
