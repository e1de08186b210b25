//! Error taxonomy.
//!
//! # Responsibilities
//! - `HttpError`: per-request outcome carried to the response envelope
//! - `RegistrationError`: route table construction failures (fatal at startup)
//!
//! # Design Decisions
//! - Every per-request error has a kind; the kind alone decides the status code
//! - Registration errors are never recovered; `main` propagates them and exits

use axum::http::{Method, StatusCode};
use thiserror::Error;

/// Classification of a per-request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// Controller, method or path absent from the route table.
    NotFound,
    /// Domain rule violated on purpose by a handler.
    Business,
    /// Anything unexpected.
    Server,
}

impl ErrorKind {
    /// HTTP status for this kind. Business failures use the configured status.
    pub fn status(self, business_status: StatusCode) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Business => business_status,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A per-request error, rendered as a failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpError {
    kind: ErrorKind,
    message: String,
    errno: i64,
}

impl HttpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errno: 0,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A business failure with an application-defined error number.
    pub fn business(errno: i64, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Business,
            message: message.into(),
            errno,
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errno(&self) -> i64 {
        self.errno
    }

    /// Abort the current request by raising this error as a fault.
    ///
    /// The middleware stack catches it; validation errors become a 400
    /// envelope, everything else goes through the panic handler.
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::server(err.to_string())
    }
}

/// Failure while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("route {pattern:?} has {len} segments, minimum is {min}")]
    PathTooShort {
        pattern: String,
        len: usize,
        min: usize,
    },

    #[error("route {pattern:?} has {len} segments, maximum is {max}")]
    PathTooLong {
        pattern: String,
        len: usize,
        max: usize,
    },

    #[error("route {pattern:?} contains an empty segment")]
    EmptySegment { pattern: String },

    #[error("route {pattern:?} does not start with controller {controller:?}")]
    ControllerMismatch { controller: String, pattern: String },

    #[error("controller {0:?} is already registered")]
    DuplicateController(String),

    #[error("duplicate route {method} {pattern}")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("route {pattern:?} declares parameter {new:?} where {existing:?} already exists")]
    ConflictingParameter {
        pattern: String,
        existing: String,
        new: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status() {
        let business = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(ErrorKind::Validation.status(business), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status(business), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Business.status(business), business);
        assert_eq!(
            ErrorKind::Server.status(business),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_errno_only_for_business() {
        assert_eq!(HttpError::validation("bad").errno(), 0);
        let err = HttpError::business(1042, "insufficient balance");
        assert_eq!(err.errno(), 1042);
        assert_eq!(err.to_string(), "insufficient balance");
    }

    #[test]
    fn test_raise_carries_error_payload() {
        let caught = std::panic::catch_unwind(|| HttpError::validation("name required").raise());
        let payload = caught.unwrap_err();
        let err = payload.downcast_ref::<HttpError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "name required");
    }
}
