//! Execution context pool.
//!
//! Contexts are created on demand and returned after each request. A
//! returned context is reset before it goes back on the idle list, so a
//! later request never observes data from an earlier one.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::Bytes;
use axum::http::Request;

use crate::http::context::Context;
use crate::http::stack::Stack;
use crate::http::writer::ResponseWriter;

#[derive(Debug)]
pub struct ContextPool {
    stack: Arc<Stack>,
    idle: Mutex<Vec<Context>>,
    created: AtomicUsize,
}

impl ContextPool {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self {
            stack,
            idle: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Take an idle context, or create one, and bind it to `request`.
    pub fn acquire(&self, writer: ResponseWriter, request: Request<Bytes>) -> Context {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut ctx = match reused {
            Some(ctx) => ctx,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Context::new(Arc::clone(&self.stack))
            }
        };
        ctx.bind(writer, request);
        ctx
    }

    /// Reset `ctx` and return it to the idle list.
    pub fn release(&self, mut ctx: Context) {
        ctx.reset();
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ctx);
    }

    /// Acquire a context that releases itself when dropped.
    pub fn checkout(self: &Arc<Self>, writer: ResponseWriter, request: Request<Bytes>) -> PooledContext {
        PooledContext {
            ctx: Some(self.acquire(writer, request)),
            pool: Arc::clone(self),
        }
    }

    /// Number of contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of contexts ever created by this pool.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// A context on loan from a `ContextPool`.
///
/// The context is only `None` once `drop` has handed it back.
pub struct PooledContext {
    ctx: Option<Context>,
    pool: Arc<ContextPool>,
}

impl Deref for PooledContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx.as_ref().expect("pooled context used after release")
    }
}

impl DerefMut for PooledContext {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_mut().expect("pooled context used after release")
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pool() -> Arc<ContextPool> {
        Arc::new(ContextPool::new(Arc::new(Stack::new())))
    }

    fn request(path: &str) -> Request<Bytes> {
        Request::builder()
            .uri(path)
            .body(Bytes::from_static(b"body"))
            .unwrap()
    }

    #[test]
    fn test_reuse_after_release() {
        let pool = pool();
        let ctx = pool.acquire(ResponseWriter::new(), request("/a/b"));
        pool.release(ctx);
        let ctx = pool.acquire(ResponseWriter::new(), request("/c/d"));
        assert_eq!(pool.created(), 1);
        assert_eq!(ctx.path(), "/c/d");
    }

    #[test]
    fn test_released_context_is_clean() {
        let pool = pool();
        let mut ctx = pool.acquire(ResponseWriter::new(), request("/a/b"));
        ctx.insert_data("secret", String::from("token"));
        ctx.ok("x");
        pool.release(ctx);

        let ctx = pool.acquire(ResponseWriter::new(), request("/c/d"));
        assert!(!ctx.has_data("secret"));
        assert!(!ctx.written());
        assert!(ctx.params().is_empty());
        assert_eq!(ctx.cursor(), -1);
    }

    #[test]
    fn test_checkout_returns_on_drop() {
        let pool = pool();
        {
            let mut ctx = pool.checkout(ResponseWriter::new(), request("/a/b"));
            ctx.insert_data("k", 1u8);
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
        let ctx = pool.checkout(ResponseWriter::new(), request("/a/b"));
        assert!(!ctx.has_data("k"));
    }

    #[test]
    fn test_checkout_cycles_reuse_one_context() {
        let pool = pool();
        for path in ["/a/b", "/c/d", "/e/f"] {
            let ctx = pool.checkout(ResponseWriter::new(), request(path));
            assert_eq!(ctx.path(), path);
            drop(ctx);
            assert_eq!(pool.idle(), 1);
        }
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = pool();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for j in 0..50 {
                        let mut ctx = pool.acquire(ResponseWriter::new(), request("/a/b"));
                        assert!(!ctx.has_data("owner"));
                        ctx.insert_data("owner", (i, j));
                        pool.release(ctx);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.created() <= 8);
        assert_eq!(pool.idle(), pool.created());
    }
}
