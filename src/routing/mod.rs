//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     registry.controller("user")
//!     → ControllerRoutes::get("/user/:id", handler)
//!     → registry.rs (length bounds, conflict detection, node insertion)
//!     → freeze() → immutable RouteTable
//!
//! Incoming Request (method, path)
//!     → segment.rs (controller + remaining segments)
//!     → matcher.rs (controller → method → segments)
//!     → Return: handler + params, or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime (no locks on reads)
//! - At most one parameter child per node, enforced at registration
//! - Static segments win over parameters; no backtracking
//! - Nodes carry the deepest reachable path length to prune early

pub mod matcher;
pub mod node;
pub mod params;
pub mod registry;
pub mod segment;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;
use crate::http::Context;

pub use matcher::{RouteMatch, RouteTable};
pub use node::{NodeKind, RouteNode};
pub use params::Params;
pub use registry::{ControllerRoutes, RouteBinding, RouteRegistry};

/// A bound route handler.
pub type Handler = Arc<dyn Fn(&mut Context) -> Result<Value, HttpError> + Send + Sync>;

/// Wrap a handler returning any serializable value.
pub fn handler<F, T>(f: F) -> Handler
where
    F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
    T: Serialize,
{
    Arc::new(move |ctx: &mut Context| -> Result<Value, HttpError> {
        let data = f(ctx)?;
        Ok(serde_json::to_value(data)?)
    })
}
