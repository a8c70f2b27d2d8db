//! Error types for step execution

use thiserror::Error;

/// Result type alias for step operations
pub type Result<T> = std::result::Result<T, StepError>;

/// Errors raised before or while a step's process runs
///
/// A non-zero exit is not an error; it is reported through the step outcome.
#[derive(Debug, Error)]
pub enum StepError {
    /// The process could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading output or waiting for exit failed
    #[error("failed to capture process output: {0}")]
    Capture(#[from] std::io::Error),

    /// A benign-failure pattern does not compile
    #[error("invalid benign-failure pattern for step '{label}': {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },
}
