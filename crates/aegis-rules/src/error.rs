//! Error taxonomy for the rule/pattern evaluator.

/// Result type alias used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while evaluating rules or compliance findings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A condition referenced a field whose value could not be compared
    /// with the operator's expected shape (e.g. `GreaterThan` on a string).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wraps a cross-cutting platform error (repository access, etc.).
    #[error(transparent)]
    Types(#[from] aegis_types::Error),
}
