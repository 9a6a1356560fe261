//! Error taxonomy for the scheduler.

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the scheduler registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task id was registered twice.
    #[error("conflict: task '{0}' is already registered")]
    DuplicateTask(String),

    /// An operation referenced a task id that isn't registered.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// A cron expression failed to parse.
    #[error("validation error: invalid cron expression '{0}': {1}")]
    InvalidSchedule(String, String),

    /// Wraps a cross-cutting platform error.
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}
