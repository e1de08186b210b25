//! Application assembly.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     AppBuilder::new(config)
//!     → controller(..).get(..) ...        (route registration)
//!     → use_middleware(..) / handle_panic  (stack assembly)
//!     → build(): freeze routes, append them as the final middleware
//!
//! Per request:
//!     App::dispatch(request)
//!     → pool.acquire → default headers → stack::run → take response → release
//! ```

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Request, Response};

use crate::config::AppConfig;
use crate::error::RegistrationError;
use crate::http::pool::ContextPool;
use crate::http::stack::{self, Middleware, Stack, StackSettings};
use crate::http::writer::ResponseWriter;
use crate::routing::{ControllerRoutes, RouteRegistry, RouteTable};

const DEFAULT_HEADERS: [(HeaderName, &str); 5] = [
    (header::CACHE_CONTROL, "no-cache"),
    (header::CONTENT_TYPE, "application/json"),
    (header::VARY, "Accept-Encoding"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "X-Requested-With"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "PUT,POST,GET,DELETE,OPTIONS"),
];

/// Headers present on every response unless a middleware overrides them.
pub fn default_headers() -> HeaderMap {
    DEFAULT_HEADERS
        .iter()
        .map(|(name, value)| (name.clone(), HeaderValue::from_static(value)))
        .collect()
}

/// Mutable registration phase.
pub struct AppBuilder {
    registry: RouteRegistry,
    stack: Stack,
}

impl AppBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            registry: RouteRegistry::from_config(&config.routing),
            stack: Stack::with_settings(StackSettings::from(&config.responses)),
        }
    }

    pub fn routes(&mut self) -> &mut RouteRegistry {
        &mut self.registry
    }

    pub fn controller(&mut self, name: &str) -> Result<ControllerRoutes<'_>, RegistrationError> {
        self.registry.controller(name)
    }

    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.stack.use_middleware(middleware);
        self
    }

    pub fn handle_panic<M: Middleware>(&mut self, handler: M) -> &mut Self {
        self.stack.handle_panic(handler);
        self
    }

    /// Freeze the route table and the stack.
    pub fn build(self) -> App {
        let Self {
            registry,
            mut stack,
        } = self;
        let routes = Arc::new(registry.freeze());
        stack.use_arc(Arc::clone(&routes) as Arc<dyn Middleware>);
        let stack = Arc::new(stack);
        tracing::info!(
            routes = routes.len(),
            middlewares = stack.len(),
            "Application built"
        );
        App {
            pool: Arc::new(ContextPool::new(Arc::clone(&stack))),
            stack,
            routes,
        }
    }
}

/// Serving phase: immutable, shared across request threads.
#[derive(Debug)]
pub struct App {
    stack: Arc<Stack>,
    routes: Arc<RouteTable>,
    pool: Arc<ContextPool>,
}

impl App {
    pub fn builder(config: &AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Run one buffered request through the stack. Blocking; call it off the
    /// async executor.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response<Body> {
        let mut writer = ResponseWriter::new();
        if let Some(headers) = writer.headers_mut() {
            headers.extend(default_headers());
        }

        let mut ctx = self.pool.checkout(writer, request);
        stack::run(&mut ctx);
        if !ctx.written() {
            tracing::debug!(path = %ctx.path(), "No response written; sending empty 200");
        }
        ctx.take_response()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::http::Context;
    use axum::http::{Method, StatusCode};

    fn app() -> App {
        let mut builder = App::builder(&AppConfig::default());
        builder
            .controller("user")
            .unwrap()
            .get("/user/:id", |ctx: &mut Context| {
                Ok(ctx.param("id").unwrap_or_default().to_string())
            })
            .unwrap();
        builder.build()
    }

    fn request(method: Method, path: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_route_table_is_last_middleware() {
        let mut builder = App::builder(&AppConfig::default());
        builder.use_middleware(|ctx: &mut Context| ctx.next());
        let app = builder.build();
        assert_eq!(app.stack().len(), 2);
    }

    #[test]
    fn test_dispatch_success() {
        let app = app();
        let response = app.dispatch(request(Method::GET, "/user/7"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::VARY], "Accept-Encoding");
    }

    #[test]
    fn test_dispatch_not_found() {
        let app = app();
        let response = app.dispatch(request(Method::GET, "/missing/7"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_short_circuit_before_routes() {
        let mut builder = App::builder(&AppConfig::default());
        builder.use_middleware(|ctx: &mut Context| {
            ctx.fail(&HttpError::business(3, "maintenance"));
        });
        let app = builder.build();
        let response = app.dispatch(request(Method::GET, "/user/7"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_dispatch_reuses_contexts() {
        let app = app();
        for _ in 0..5 {
            app.dispatch(request(Method::GET, "/user/1"));
        }
        assert_eq!(app.pool().created(), 1);
        assert_eq!(app.pool().idle(), 1);
    }
}
