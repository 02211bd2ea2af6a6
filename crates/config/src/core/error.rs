//! Configuration error types

use crate::schema::ValidationIssue;
use crate::template::TemplateIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[non_exhaustive]
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ConfigError {
    /// The document violates the schema; every offending path is listed
    #[error("Configuration validation failed: {}", join_issues(.errors))]
    SchemaViolation {
        /// All violations found in one pass
        errors: Vec<ValidationIssue>,
    },

    /// One or more placeholders could not be resolved
    #[error("Template resolution failed: {}", join_template_issues(.issues))]
    TemplateResolution {
        /// Failed placeholders with their unresolved text
        issues: Vec<TemplateIssue>,
    },

    /// Malformed path, or a path that does not fit the tree shape
    #[error("Invalid path '{path}': {message}")]
    InvalidPath {
        /// Path as supplied
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// Nothing is stored at the path
    #[error("No value at path '{path}'")]
    PathNotFound {
        /// Path as supplied
        path: String,
    },

    /// No snapshot has ever been committed
    #[error("Configuration is not loaded")]
    NotLoaded,

    /// Configuration type error
    #[error("Configuration type error: {message}")]
    TypeError {
        /// Error message describing the type mismatch
        message: String,
        /// Expected type
        expected: String,
        /// Actual type encountered
        actual: String,
    },

    /// The provider could not supply a document
    #[error("Configuration source unavailable ({origin}): {message}")]
    SourceUnavailable {
        /// Which source failed
        origin: String,
        /// Error message describing the failure
        message: String,
    },

    /// Source content could not be parsed
    #[error("Failed to parse configuration from {origin}: {message}")]
    ParseError {
        /// Source or format that failed
        origin: String,
        /// Parser message
        message: String,
    },

    /// Reload exceeded the caller's timeout; the previous snapshot is kept
    #[error("Configuration reload timed out after {timeout:?}")]
    ReloadTimeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// Configuration watch error
    #[error("Configuration watch error: {message}")]
    WatchError {
        /// Error message describing the watch failure
        message: String,
    },
}

/// Error category for grouping errors
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing value or document
    NotFound,
    /// Source or watcher I/O
    Io,
    /// Parse error
    Parse,
    /// Schema or type validation
    Validation,
    /// Template resolution
    Template,
    /// Caller-side misuse or timing
    Operation,
}

impl ConfigError {
    /// Create a schema violation error
    pub fn schema_violation(errors: Vec<ValidationIssue>) -> Self {
        Self::SchemaViolation { errors }
    }

    /// Create a template resolution error
    pub fn template_resolution(issues: Vec<TemplateIssue>) -> Self {
        Self::TemplateResolution { issues }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a path-not-found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a type error
    pub fn type_error(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeError {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a source-unavailable error
    pub fn source_unavailable(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a reload timeout error
    pub fn reload_timeout(timeout: Duration) -> Self {
        Self::ReloadTimeout { timeout }
    }

    /// Create a watch error
    pub fn watch_error(message: impl Into<String>) -> Self {
        Self::WatchError {
            message: message.into(),
        }
    }

    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationIssue] {
        match self {
            Self::SchemaViolation { errors } => errors,
            _ => &[],
        }
    }

    /// Whether the manager can keep serving its previous snapshot after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigError::SchemaViolation { .. }
                | ConfigError::TemplateResolution { .. }
                | ConfigError::SourceUnavailable { .. }
                | ConfigError::ParseError { .. }
                | ConfigError::ReloadTimeout { .. }
        )
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::PathNotFound { .. } | ConfigError::NotLoaded => ErrorCategory::NotFound,
            ConfigError::SourceUnavailable { .. } | ConfigError::WatchError { .. } => {
                ErrorCategory::Io
            }
            ConfigError::ParseError { .. } => ErrorCategory::Parse,
            ConfigError::SchemaViolation { .. } | ConfigError::TypeError { .. } => {
                ErrorCategory::Validation
            }
            ConfigError::TemplateResolution { .. } => ErrorCategory::Template,
            ConfigError::InvalidPath { .. } | ConfigError::ReloadTimeout { .. } => {
                ErrorCategory::Operation
            }
        }
    }
}

fn join_issues(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_template_issues(issues: &[TemplateIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::source_unavailable("io", err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::parse_error("json", err.to_string())
    }
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::parse_error("toml", err.to_string())
    }
}

impl From<notify::Error> for ConfigError {
    fn from(err: notify::Error) -> Self {
        ConfigError::watch_error(err.to_string())
    }
}
