//! Cross-cutting error taxonomy shared by every AegisShield subsystem.
//!
//! Each subsystem crate layers its own `Error` enum on top of this one
//! (`#[from] aegis_types::error::Error`), following the same per-crate
//! error-enum convention the rest of the workspace uses.

/// Result type alias used across AegisShield crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Behavioral error categories from the platform's error-handling design:
/// validation, not-found, conflict, overload signals, transient faults, and
/// fatal faults. Variants are named for behavior, not for a specific type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected request shape, unknown enum, missing required field.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of what failed validation.
        message: String,
    },

    /// Referenced id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// Identifier that could not be found.
        id: String,
    },

    /// Duplicate id or illegal state transition.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable description of the conflict.
        message: String,
    },

    /// Caller is being asked to back off; not a system failure.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Context describing which limiter rejected the request.
        message: String,
    },

    /// A bounded queue was full.
    #[error("queue full: {message}")]
    QueueFull {
        /// Context describing which queue rejected the request.
        message: String,
    },

    /// A circuit breaker is open and is short-circuiting calls.
    #[error("circuit open: {message}")]
    CircuitOpen {
        /// Context describing which circuit is open.
        message: String,
    },

    /// I/O, vendor HTTP, bus publish, or similar transient fault.
    #[error("transient error: {0}")]
    Transient(String),

    /// Template parse error, missing schema, corrupt artifact — no retry.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller-visible cancellation (context deadline or explicit cancel).
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Construct a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Construct a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Construct a [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// True for categories the caller should retry with backoff rather than
    /// treat as a system failure (overload signals and transient faults).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. } | Error::QueueFull { .. } | Error::CircuitOpen { .. } | Error::Transient(_)
        )
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Fatal(message)
    }
}
