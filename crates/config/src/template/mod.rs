//! Placeholder templates inside configuration strings
//!
//! A placeholder body is a variable path followed by an optional pipeline:
//! `{{personal.name|lowercase|truncate:12}}`. Variables come from the
//! config, environment, runtime and custom namespaces of a
//! [`TemplateContext`].

mod analysis;
mod context;
mod engine;
mod functions;
mod issue;
mod pattern;

pub use context::{TemplateContext, TemplateContextBuilder, default_runtime_facts};
pub use engine::{Resolution, TemplateEngine, TemplatePreview};
pub use functions::{FunctionError, FunctionRegistry, FunctionResult, TemplateArg, TemplateFunction};
pub use issue::{Severity, TemplateIssue, TemplateIssueKind};
pub use pattern::PatternKind;
