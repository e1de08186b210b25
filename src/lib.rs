//! Switchyard: a controller-oriented JSON HTTP framework.
//!
//! Routes are registered per controller into a segment trie, requests run
//! through a synchronous middleware stack inside a fault boundary, and every
//! outcome is written as a JSON envelope.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod session;

pub use app::{App, AppBuilder};
pub use config::AppConfig;
pub use error::{ErrorKind, HttpError, RegistrationError};
pub use http::{Context, HttpServer, Middleware};
pub use lifecycle::Shutdown;
