//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → broadcast to every subscriber, once
//!
//! Signals (signals.rs):
//!     Ctrl+C or shutdown broadcast → server stops accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Either source ends the serve loop; in-flight requests finish first

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
