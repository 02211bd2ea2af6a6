//! Result type and utilities for configuration operations

use super::error::ConfigError;

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Extension trait for Result types to add configuration-specific utilities
pub trait ConfigResultExt<T> {
    /// Prefix a source error message with context
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String;

    /// Convert to option, logging error if present
    fn log_error(self) -> Option<T>;
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e {
            ConfigError::SourceUnavailable { message, origin } => {
                let ctx = f();
                ConfigError::SourceUnavailable {
                    message: format!("{ctx}: {message}"),
                    origin,
                }
            }
            ConfigError::ParseError { message, origin } => {
                let ctx = f();
                ConfigError::ParseError {
                    message: format!("{ctx}: {message}"),
                    origin,
                }
            }
            other => other,
        })
    }

    fn log_error(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                folio_log::error!(error = %e, "Configuration error");
                None
            }
        }
    }
}
