//! Fail-slow validation with default filling

use super::node::SchemaNode;
use crate::core::document::{child_index_path, child_key_path, json_type_name};
use crate::core::path::{self, format_path, parse_path};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// One error or warning, attached to a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path of the offending field (empty for the root)
    pub path: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Every violation found, in traversal order
    pub errors: Vec<ValidationIssue>,
    /// Non-fatal findings (unknown keys, deprecated fields)
    pub warnings: Vec<ValidationIssue>,
    document: Value,
}

impl ValidationResult {
    /// True iff there are no errors
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Default-filled document, only when valid
    pub fn value(&self) -> Option<&Value> {
        self.is_valid().then_some(&self.document)
    }

    /// Consume into the default-filled document, only when valid
    pub fn into_value(self) -> Option<Value> {
        if self.is_valid() {
            Some(self.document)
        } else {
            None
        }
    }

    /// Default-filled document regardless of errors
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Consume into the default-filled document regardless of errors
    pub fn into_document(self) -> Value {
        self.document
    }
}

#[derive(Default)]
struct Report {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Report {
    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(path, message));
    }

    fn warning(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(path, message));
    }
}

/// Validates documents against a shared schema tree
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Arc<SchemaNode>,
}

impl SchemaValidator {
    /// Create a validator over `schema`
    pub fn new(schema: impl Into<Arc<SchemaNode>>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// The schema tree
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Validate a whole document, filling declared defaults
    pub fn validate(&self, raw: &Value) -> ValidationResult {
        let mut report = Report::default();
        let document = self
            .check(Some(raw), &self.schema, "", &mut report)
            .unwrap_or_else(|| raw.clone());
        let result = ValidationResult {
            errors: report.errors,
            warnings: report.warnings,
            document,
        };
        folio_log::debug!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated configuration document"
        );
        result
    }

    /// Validate only the subtree at `path` of `doc`
    ///
    /// When the schema has no node for `path`, the nearest declared ancestor
    /// is validated instead. The returned document is all of `doc` with that
    /// subtree default-filled.
    pub fn validate_at(&self, doc: &Value, path: &str) -> ValidationResult {
        let mut report = Report::default();
        let segments = match parse_path(path) {
            Ok(segments) => segments,
            Err(e) => {
                report.error(path, e.to_string());
                return ValidationResult {
                    errors: report.errors,
                    warnings: report.warnings,
                    document: doc.clone(),
                };
            }
        };

        let mut depth = segments.len();
        let node = loop {
            let prefix = &segments[..depth];
            if let Some(node) = prefix
                .iter()
                .try_fold(&*self.schema, |node, segment| node.child(segment))
            {
                break node;
            }
            depth -= 1;
        };

        let anchor = format_path(&segments[..depth]);
        let current = path::get_segments(doc, &segments[..depth]);
        let document = match self.check(current, node, &anchor, &mut report) {
            Some(filled) if current != Some(&filled) => {
                path::set(doc, &anchor, filled).unwrap_or_else(|_| doc.clone())
            }
            _ => doc.clone(),
        };

        ValidationResult {
            errors: report.errors,
            warnings: report.warnings,
            document,
        }
    }

    fn check(
        &self,
        value: Option<&Value>,
        node: &SchemaNode,
        path: &str,
        report: &mut Report,
    ) -> Option<Value> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return match &node.default {
                Some(Value::Null) => Some(Value::Null),
                Some(default) => self.check(Some(default), node, path, report),
                None => {
                    if node.required {
                        report.error(path, "required field is missing");
                    }
                    None
                }
            };
        };

        if let Some(note) = &node.deprecated {
            report.warning(path, format!("deprecated: {note}"));
        }

        if !node.kind.accepts(value) {
            let reason = format!("expected {}, got {}", node.kind, json_type_name(value));
            report.error(path, node.message.clone().unwrap_or(reason));
            return Some(value.clone());
        }

        if let Some(reason) = node.predicates.iter().find_map(|p| p.check(value)) {
            report.error(path, node.message.clone().unwrap_or(reason));
        }

        match value {
            Value::Object(obj) => Some(Value::Object(self.check_object(obj, node, path, report))),
            Value::Array(items) => Some(Value::Array(self.check_array(items, node, path, report))),
            scalar => Some(scalar.clone()),
        }
    }

    fn check_object(
        &self,
        obj: &Map<String, Value>,
        node: &SchemaNode,
        path: &str,
        report: &mut Report,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for (key, child) in &node.properties {
            let child_path = child_key_path(path, key);
            let original = obj.get(key);
            match self.check(original, child, &child_path, report) {
                Some(filled) => {
                    out.insert(key.clone(), filled);
                }
                None => {
                    if let Some(original) = original {
                        out.insert(key.clone(), original.clone());
                    }
                }
            }
        }

        for (key, value) in obj {
            if node.properties.contains_key(key) {
                continue;
            }
            let child_path = child_key_path(path, key);
            let checked = match node.additional.as_deref() {
                Some(values) => self.check(Some(value), values, &child_path, report),
                None if node.strict => {
                    report.error(&child_path, "unknown field");
                    None
                }
                None if !node.properties.is_empty() => {
                    report.warning(&child_path, "unknown field");
                    None
                }
                None => None,
            };
            out.insert(key.clone(), checked.unwrap_or_else(|| value.clone()));
        }

        out
    }

    fn check_array(
        &self,
        items: &[Value],
        node: &SchemaNode,
        path: &str,
        report: &mut Report,
    ) -> Vec<Value> {
        let Some(item_node) = node.items.as_deref() else {
            return items.to_vec();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let item_path = child_index_path(path, index);
                self.check(Some(item), item_node, &item_path, report)
                    .unwrap_or_else(|| item.clone())
            })
            .collect()
    }
}
