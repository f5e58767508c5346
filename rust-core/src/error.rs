//! Error types for environment matching.

use thiserror::Error;

/// Errors raised by environment construction, matching and result access.
///
/// A "no match" outcome of a similarity test is not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchEnvError {
    /// Bad index, mismatched lengths or invalid configuration value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// More vectors offered to an environment than it can hold
    #[error("Environment capacity of {capacity} vectors exceeded")]
    OutOfCapacity { capacity: usize },

    /// Result accessor called without a completed run
    #[error("No completed run: {0}")]
    EmptyResult(&'static str),
}

impl MatchEnvError {
    /// Creates an invalid argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        MatchEnvError::InvalidArgument(message.into())
    }
}

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, MatchEnvError>;
