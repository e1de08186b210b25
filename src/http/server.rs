//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatcher as fallback
//! - Wire up middleware (request ID, tracing)
//! - Enforce the request timeout with a failure envelope
//! - Buffer request bodies up to the configured limit
//! - Run the synchronous middleware stack on the blocking pool
//! - Bind server to listener with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::app::App;
use crate::config::AppConfig;
use crate::error::{ErrorKind, HttpError};
use crate::http::envelope::{failure_response, INTERNAL_ERROR_MESSAGE};
use crate::http::stack::StackSettings;
use crate::lifecycle::shutdown_signal;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Message of the envelope sent when `timeouts.request_secs` elapses.
pub const REQUEST_TIMEOUT_MESSAGE: &str = "Request timed out";

/// State injected into the dispatcher.
#[derive(Clone)]
pub struct ServerState {
    pub app: Arc<App>,
    pub max_body_size: usize,
    pub request_timeout: Duration,
    pub settings: StackSettings,
}

impl ServerState {
    /// Failure envelope for errors raised before or around dispatch.
    fn reject(&self, err: &HttpError) -> Response {
        if self.settings.production && err.kind() == ErrorKind::Server {
            let masked = HttpError::server(INTERNAL_ERROR_MESSAGE);
            return failure_response(&masked, self.settings.business_status);
        }
        failure_response(err, self.settings.business_status)
    }
}

/// HTTP server hosting one `App`.
pub struct HttpServer {
    router: Router,
    app: Arc<App>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(app: App, config: &AppConfig) -> Self {
        let app = Arc::new(app);
        let router = router(Arc::clone(&app), config);
        Self { router, app }
    }

    /// The fully layered Axum router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Run the server until Ctrl+C or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.app.routes().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn router(app: Arc<App>, config: &AppConfig) -> Router {
    let state = ServerState {
        app,
        max_body_size: config.limits.max_body_size,
        request_timeout: Duration::from_secs(config.timeouts.request_secs),
        settings: StackSettings::from(&config.responses),
    };
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .fallback(dispatch_request)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

/// Buffer the body and hand the request to the app on the blocking pool.
///
/// The request timeout covers body buffering and dispatch. On expiry the
/// client gets a server failure envelope; the blocking task still runs to
/// completion and returns its context to the pool.
async fn dispatch_request(State(state): State<ServerState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(state.request_timeout, buffer_and_dispatch(&state, request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                path = %path,
                timeout_secs = state.request_timeout.as_secs(),
                "Request timed out"
            );
            state.reject(&HttpError::server(REQUEST_TIMEOUT_MESSAGE))
        }
    }
}

async fn buffer_and_dispatch(state: &ServerState, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_size,
                error = %e,
                "Rejected request body"
            );
            return state.reject(&HttpError::validation("request body too large or unreadable"));
        }
    };

    let request = Request::from_parts(parts, bytes);
    let app = Arc::clone(&state.app);
    match tokio::task::spawn_blocking(move || app.dispatch(request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            state.reject(&HttpError::server(INTERNAL_ERROR_MESSAGE))
        }
    }
}
