//! Structured template findings

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with a placeholder
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateIssueKind {
    /// Placeholder with no body or no variable
    EmptyPlaceholder,
    /// Opening delimiter inside another placeholder
    NestedDelimiter,
    /// Opening delimiter without a matching close
    UnclosedDelimiter,
    /// Pipeline names a function that is not registered
    UnknownFunction,
    /// A function rejected its input or arguments
    FunctionFailed,
    /// Placeholder text survived every resolution pass
    Unresolved,
}

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Breaks resolution
    Error,
    /// Resolution continues
    Warning,
}

/// One template finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateIssue {
    /// Finding kind
    pub kind: TemplateIssueKind,
    /// Severity
    pub severity: Severity,
    /// Placeholder text as written
    pub placeholder: String,
    /// Human-readable detail
    pub message: String,
    /// Byte offset of the placeholder in its template
    pub offset: usize,
    /// Document path of the string leaf, when resolving a whole document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl TemplateIssue {
    /// Create an issue at `offset`
    pub fn new(
        kind: TemplateIssueKind,
        placeholder: impl Into<String>,
        message: impl Into<String>,
        offset: usize,
    ) -> Self {
        let severity = match kind {
            TemplateIssueKind::UnknownFunction => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            kind,
            severity,
            placeholder: placeholder.into(),
            message: message.into(),
            offset,
            path: None,
        }
    }

    /// Attach the document path
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{path}: {} ({})", self.message, self.placeholder),
            None => write!(
                f,
                "offset {}: {} ({})",
                self.offset, self.message, self.placeholder
            ),
        }
    }
}
