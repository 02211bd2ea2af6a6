//! Schema declaration and validation
//!
//! A [`SchemaNode`] tree is built once (by hand or from JSON Schema) and
//! shared read-only. [`SchemaValidator`] walks it fail-slow: every violation
//! is collected in one pass and declared defaults are filled in.

mod formats;
mod json;
mod node;
mod validator;

pub use formats::StringFormat;
pub use node::{CustomCheck, Predicate, SchemaKind, SchemaNode};
pub use validator::{SchemaValidator, ValidationIssue, ValidationResult};
