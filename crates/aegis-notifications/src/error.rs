//! Error taxonomy for the notification manager.

use aegis_types::Channel;

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the notification manager and its channel adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No adapter is registered for the notification's channel.
    #[error("unsupported channel: {0:?}")]
    UnsupportedChannel(Channel),

    /// Template rendering failed; fatal for the notification, not retried.
    #[error("template error: {0}")]
    Template(String),

    /// Wraps a cross-cutting platform error.
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}

impl Error {
    /// True for categories that should be retried with backoff rather than
    /// treated as a terminal failure for the notification.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Types(inner) => inner.is_retryable(),
            Error::UnsupportedChannel(_) | Error::Template(_) => false,
        }
    }
}
