//! Stop switch for running servers.
//!
//! `HttpServer::run` takes a receiver from `subscribe()`; firing the switch
//! ends its serve loop the same way Ctrl+C does. The switch fires at most
//! once, later calls to `trigger()` reach nobody.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

pub struct Shutdown {
    stop: broadcast::Sender<()>,
    fired: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stop, _) = broadcast::channel(1);
        Self {
            stop,
            fired: AtomicBool::new(false),
        }
    }

    /// Receiver to hand to `HttpServer::run`. Receivers taken after the
    /// switch fired never resolve through it.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.stop.subscribe()
    }

    /// Stop every subscribed server. Returns how many receivers got the
    /// signal; zero on repeat calls or when nothing is subscribed.
    pub fn trigger(&self) -> usize {
        if self.fired.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let servers = self.stop.send(()).unwrap_or(0);
        tracing::info!(servers, "Stopping servers");
        servers
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Receivers still alive, i.e. servers that have not exited yet.
    pub fn receiver_count(&self) -> usize {
        self.stop.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
