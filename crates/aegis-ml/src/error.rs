//! Error taxonomy for the inference and training engines.

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the predictor registry, inference engine, and
/// training engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request named an unregistered algorithm or malformed parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// `predict`/`predictBatch` called for a model that was never loaded,
    /// or whose predictor reports unhealthy.
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    /// The engine has been shut down and refuses further work.
    #[error("inference engine shut down")]
    ShutDown,

    /// Wraps a cross-cutting platform error (repository access,
    /// not-found, rate limiting, circuit open, queue full, …).
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}

impl Error {
    /// Whether the caller should consider retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Types(inner) if inner.is_retryable())
    }
}
