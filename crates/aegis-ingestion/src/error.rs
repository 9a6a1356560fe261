//! Error taxonomy for the ingestion pipeline.

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the upload and streamed-record pipelines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request named a malformed upload or job transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wraps a cross-cutting platform error (repository access, object
    /// storage, bus publish, not-found, …).
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}

impl Error {
    /// Whether the caller should consider retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Types(inner) if inner.is_retryable())
    }
}
