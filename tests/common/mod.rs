//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Response;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use switchyard::http::{Fault, PANIC_KEY};
use switchyard::{App, AppConfig, Context, HttpError, HttpServer, Shutdown};

/// The application used across integration tests.
pub fn build_app(config: &AppConfig) -> App {
    let mut builder = App::builder(config);
    builder.handle_panic(|ctx: &mut Context| {
        let message = ctx
            .data::<Fault>(PANIC_KEY)
            .map(|fault| fault.message().to_string())
            .unwrap_or_default();
        ctx.fail(&HttpError::server(format!("recovered: {message}")));
    });

    builder
        .controller("user")
        .unwrap()
        .get("/user/:id", |ctx: &mut Context| {
            Ok(json!({ "id": ctx.param("id").unwrap_or_default() }))
        })
        .unwrap()
        .get("/user/list", |_ctx: &mut Context| Ok(vec!["ada", "grace"]))
        .unwrap()
        .post("/user/create", |ctx: &mut Context| {
            let body = ctx.body_json()?;
            let Some(name) = body.get("name").and_then(Value::as_str) else {
                HttpError::validation("name is required").raise();
            };
            Ok(json!({ "name": name }))
        })
        .unwrap()
        .delete("/user/:id", |_ctx: &mut Context| -> Result<(), HttpError> {
            Err(HttpError::business(1001, "user is locked"))
        })
        .unwrap();

    builder
        .controller("crash")
        .unwrap()
        .get("/crash/now", |_ctx: &mut Context| -> Result<(), HttpError> {
            panic!("handler exploded")
        })
        .unwrap();

    builder.build()
}

/// Read a response body as JSON.
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Start the test app on an ephemeral port. Dropping the returned
/// `Shutdown` (or triggering it) stops the server.
pub async fn spawn_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(build_app(&config), &config);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
