//! Fault boundary.
//!
//! # Responsibilities
//! - Run a closure and turn any unwinding panic into a `Fault`
//! - Capture the backtrace at the panic site, not at the catch site
//!
//! # Design Decisions
//! - A process-wide panic hook records the backtrace into a thread-local
//!   while a boundary is active and stays silent; outside a boundary it
//!   defers to the previously installed hook
//! - Boundaries nest; each restores the enclosing state on exit

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::error::HttpError;

thread_local! {
    static INSIDE_BOUNDARY: Cell<bool> = const { Cell::new(false) };
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if INSIDE_BOUNDARY.with(Cell::get) {
                let trace = format!("{info}\n{}", Backtrace::force_capture());
                LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// A panic caught at a fault boundary.
pub struct Fault {
    message: String,
    trace: String,
    payload: Box<dyn Any + Send>,
}

impl Fault {
    fn new(payload: Box<dyn Any + Send>, trace: String) -> Self {
        let message = if let Some(err) = payload.downcast_ref::<HttpError>() {
            err.message().to_string()
        } else if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown fault".to_string()
        };
        Self {
            message,
            trace,
            payload,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw panic payload.
    pub fn payload(&self) -> &(dyn Any + Send) {
        &*self.payload
    }

    /// The payload as an `HttpError`, when the fault was raised with one.
    pub fn http_error(&self) -> Option<&HttpError> {
        self.payload.downcast_ref::<HttpError>()
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Trace cut to at most `limit` bytes on a char boundary.
    pub fn bounded_trace(&self, limit: usize) -> &str {
        if self.trace.len() <= limit {
            return &self.trace;
        }
        let mut end = limit;
        while !self.trace.is_char_boundary(end) {
            end -= 1;
        }
        &self.trace[..end]
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Run `f`, converting a panic into a `Fault`.
pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, Fault> {
    install_hook();
    let enclosing = INSIDE_BOUNDARY.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    INSIDE_BOUNDARY.with(|flag| flag.set(enclosing));

    result.map_err(|payload| {
        let trace = LAST_TRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default();
        Fault::new(payload, trace)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_passes_value_through() {
        assert_eq!(catch(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_catch_string_payload() {
        let fault = catch(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(fault.message(), "boom 1");
        assert!(fault.trace().contains("boom 1"));
        assert!(fault.http_error().is_none());
    }

    #[test]
    fn test_catch_http_error_payload() {
        let fault = catch(|| HttpError::validation("name required").raise()).unwrap_err();
        assert_eq!(fault.message(), "name required");
        assert_eq!(
            fault.http_error().map(HttpError::kind),
            Some(crate::error::ErrorKind::Validation)
        );
    }

    #[test]
    fn test_nested_boundaries() {
        let outer = catch(|| {
            let inner = catch(|| panic!("inner"));
            assert!(inner.is_err());
            panic!("outer");
        })
        .unwrap_err();
        assert_eq!(outer.message(), "outer");
        assert!(!INSIDE_BOUNDARY.with(Cell::get));
    }

    #[test]
    fn test_bounded_trace() {
        let fault = Fault::new(Box::new("x"), "héllo world".to_string());
        assert_eq!(fault.bounded_trace(2), "h");
        assert_eq!(fault.bounded_trace(3), "hé");
        assert_eq!(fault.bounded_trace(100), "héllo world");
    }
}
