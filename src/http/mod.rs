//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body buffering)
//!     → App::dispatch on the blocking pool
//!     → pool.rs (acquire a reset Context)
//!     → stack.rs (fault boundary, middlewares in order, route table last)
//!     → writer.rs (write-once status, headers, body)
//!     → envelope.rs (JSON success / failure body)
//!     → Send to client, Context back to the pool
//! ```

pub mod context;
pub mod envelope;
pub mod fault;
pub mod middleware;
pub mod pool;
pub mod server;
pub mod stack;
pub mod writer;

pub use context::{Context, CONTROLLER_KEY, PANIC_KEY, SESSION_KEY, SID_KEY};
pub use envelope::Envelope;
pub use fault::Fault;
pub use pool::{ContextPool, PooledContext};
pub use server::HttpServer;
pub use stack::{Middleware, Stack, StackSettings};
pub use writer::ResponseWriter;
