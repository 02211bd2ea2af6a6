//! Error type for logger setup

use thiserror::Error;

/// Result alias for logger operations
pub type LogResult<T> = Result<T, LogError>;

/// Logger setup failure
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LogError {
    /// The filter directive could not be parsed
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// The directive as supplied
        filter: String,
        /// Parser message
        reason: String,
    },

    /// Runtime reload of the filter failed
    #[error("Failed to reload filter: {0}")]
    Reload(String),

    /// A global subscriber was already installed
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

impl LogError {
    /// Create a filter parsing error
    pub fn filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}
