//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middlewares and the server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The filter comes from `RUST_LOG` when set, otherwise from config
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
