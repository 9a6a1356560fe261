//! Error taxonomy for the graph engine.

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the graph client, orchestrator, pattern detector, and
/// entity resolver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request named an unknown strategy, pattern type, or malformed
    /// parameter shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Analysis was cancelled before (or during) a semaphore acquisition.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Wraps a cross-cutting platform error (repository access, bus
    /// publish, not-found, …).
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}

impl Error {
    /// Whether the caller should consider retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Types(inner) if inner.is_retryable())
    }
}
