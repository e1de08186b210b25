//! Switchyard demo server.
//!
//! ```text
//!     Client Request
//!     ──────────▶ axum (request id, trace, timeout, body limit)
//!                 │
//!                 ▼  spawn_blocking
//!                 ContextPool ──▶ Stack: RequestLogger → ... → RouteTable
//!                 │                                         │
//!                 │                        controller → method → segments
//!                 ▼                                         ▼
//!     ◀────────── JSON envelope ◀────────────────────── handler
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_config, validate_config, AppConfig, ConfigError};
use switchyard::http::middleware::RequestLogger;
use switchyard::http::{Fault, PANIC_KEY};
use switchyard::observability::{logging, metrics};
use switchyard::{App, Context, HttpError, HttpServer, RegistrationError, Shutdown};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Controller-oriented JSON HTTP server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    address: Option<String>,

    /// Hide server failure details from clients.
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(address) = cli.address {
        config.listener.bind_address = address;
    }
    if cli.production {
        config.responses.production = true;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(Some(&config.observability.log_level))?;
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        production = config.responses.production,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let app = build_app(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    HttpServer::new(app, &config)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(config: &AppConfig) -> Result<App, RegistrationError> {
    let mut builder = App::builder(config);
    builder
        .use_middleware(RequestLogger::new())
        .handle_panic(|ctx: &mut Context| {
            let message = ctx
                .data::<Fault>(PANIC_KEY)
                .map(|fault| fault.message().to_string())
                .unwrap_or_default();
            ctx.fail(&HttpError::server(message));
        });

    builder
        .controller("user")?
        .get("/user/:id", |ctx: &mut Context| {
            let id = ctx.param("id").unwrap_or_default();
            Ok(json!({ "id": id }))
        })?
        .post("/user/create", |ctx: &mut Context| {
            let body = ctx.body_json()?;
            let Some(name) = body.get("name").and_then(|v| v.as_str()) else {
                HttpError::validation("name is required").raise();
            };
            Ok(json!({ "name": name }))
        })?;

    builder
        .controller("health")?
        .get("/health/status", |_ctx: &mut Context| Ok("ok"))?;

    Ok(builder.build())
}
