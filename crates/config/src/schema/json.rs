//! Compile a JSON Schema subset into a `SchemaNode` tree

use super::formats::StringFormat;
use super::node::{Predicate, SchemaKind, SchemaNode};
use crate::core::{ConfigError, ConfigResult};
use serde_json::{Map, Value};

const MAX_REF_DEPTH: usize = 32;

impl SchemaNode {
    /// Compile a JSON Schema document
    ///
    /// Supported keywords: `type`, `properties`, `required`,
    /// `additionalProperties`, `items`, `enum`, `const`, `default`,
    /// `description`, `deprecated`, `minLength`, `maxLength`, `pattern`,
    /// `format`, `minimum`, `maximum`, `exclusiveMinimum`,
    /// `exclusiveMaximum`, `multipleOf`, `minItems`, `maxItems`,
    /// `uniqueItems` and local `$ref`s into `definitions`/`$defs`.
    /// `errorMessage` sets the field-specific failure message.
    pub fn from_json_schema(schema: &Value) -> ConfigResult<Self> {
        Compiler { root: schema }.compile(schema, "", 0)
    }

    /// Compile a JSON Schema given as text
    pub fn from_json_schema_str(schema: &str) -> ConfigResult<Self> {
        let schema: Value = serde_json::from_str(schema)?;
        Self::from_json_schema(&schema)
    }
}

struct Compiler<'a> {
    root: &'a Value,
}

fn schema_error(path: &str, message: impl std::fmt::Display) -> ConfigError {
    let at = if path.is_empty() { "<root>" } else { path };
    ConfigError::parse_error("json schema", format!("{at}: {message}"))
}

impl Compiler<'_> {
    fn compile(&self, schema: &Value, path: &str, depth: usize) -> ConfigResult<SchemaNode> {
        match schema {
            Value::Bool(true) => Ok(SchemaNode::any()),
            Value::Bool(false) => Ok(SchemaNode::any().custom("never", |_| false)),
            Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                    if depth >= MAX_REF_DEPTH {
                        return Err(schema_error(path, "reference nesting too deep"));
                    }
                    let target = self.resolve_ref(reference, path)?;
                    return self.compile(target, path, depth + 1);
                }
                self.compile_object(obj, path, depth)
            }
            other => Err(schema_error(path, format!("schema must be an object, got {other}"))),
        }
    }

    fn resolve_ref(&self, reference: &str, path: &str) -> ConfigResult<&Value> {
        let target = reference
            .strip_prefix("#/definitions/")
            .and_then(|name| self.root.get("definitions")?.get(name))
            .or_else(|| {
                reference
                    .strip_prefix("#/$defs/")
                    .and_then(|name| self.root.get("$defs")?.get(name))
            });
        target.ok_or_else(|| schema_error(path, format!("cannot resolve reference '{reference}'")))
    }

    fn compile_object(
        &self,
        obj: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> ConfigResult<SchemaNode> {
        let kind = match obj.get("type") {
            None => infer_kind(obj),
            Some(Value::String(name)) => parse_kind(name, path)?,
            Some(Value::Array(names)) => {
                let non_null: Vec<&str> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|n| *n != "null")
                    .collect();
                match non_null.as_slice() {
                    [single] => parse_kind(single, path)?,
                    _ => SchemaKind::Any,
                }
            }
            Some(other) => return Err(schema_error(path, format!("invalid type {other}"))),
        };

        let mut node = SchemaNode::new(kind);

        if let Some(default) = obj.get("default") {
            node = node.with_default(default.clone());
        }
        if let Some(description) = obj.get("description").and_then(Value::as_str) {
            node = node.describe(description);
        }
        if let Some(message) = obj.get("errorMessage").and_then(Value::as_str) {
            node = node.message(message);
        }
        match obj.get("deprecated") {
            Some(Value::Bool(true)) => node = node.deprecated("field is deprecated"),
            Some(Value::String(note)) => node = node.deprecated(note.clone()),
            _ => {}
        }

        node = self.compile_predicates(node, obj, path)?;

        if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
            let required: Vec<&str> = obj
                .get("required")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            for (name, child) in properties {
                let child_path = crate::core::document::child_key_path(path, name);
                let child = self
                    .compile(child, &child_path, depth)?
                    .with_required(required.contains(&name.as_str()));
                node = node.property(name.clone(), child);
            }
        }

        match obj.get("additionalProperties") {
            Some(Value::Bool(false)) => node = node.strict(),
            Some(extra @ Value::Object(_)) => {
                node = node.values(self.compile(extra, &format!("{path}.*"), depth)?);
            }
            _ => {}
        }

        if let Some(items) = obj.get("items") {
            node = node.items(self.compile(items, &format!("{path}[]"), depth)?);
        }

        Ok(node)
    }

    fn compile_predicates(
        &self,
        mut node: SchemaNode,
        obj: &Map<String, Value>,
        path: &str,
    ) -> ConfigResult<SchemaNode> {
        if let Some(allowed) = obj.get("enum").and_then(Value::as_array) {
            node = node.predicate(Predicate::OneOf(allowed.clone()));
        }
        if let Some(constant) = obj.get("const") {
            node = node.predicate(Predicate::OneOf(vec![constant.clone()]));
        }
        if let Some(min) = obj.get("minLength").and_then(as_usize) {
            node = node.min_length(min);
        }
        if let Some(max) = obj.get("maxLength").and_then(as_usize) {
            node = node.max_length(max);
        }
        if let Some(pattern) = obj.get("pattern").and_then(Value::as_str) {
            node = node.pattern(pattern).map_err(|e| schema_error(path, e))?;
        }
        if let Some(format) = obj.get("format").and_then(Value::as_str) {
            match format.parse::<StringFormat>() {
                Ok(format) => node = node.format(format),
                Err(reason) => {
                    folio_log::warn!(path = %path, format = %format, "Ignoring schema format: {reason}");
                }
            }
        }

        // Draft 4 uses boolean exclusive flags, later drafts numeric bounds
        let exclusive_min = obj.get("exclusiveMinimum");
        if let Some(min) = obj.get("minimum").and_then(Value::as_f64) {
            let exclusive = exclusive_min.and_then(Value::as_bool).unwrap_or(false);
            node = node.predicate(Predicate::Minimum { value: min, exclusive });
        }
        if let Some(min) = exclusive_min.and_then(Value::as_f64) {
            node = node.predicate(Predicate::Minimum { value: min, exclusive: true });
        }
        let exclusive_max = obj.get("exclusiveMaximum");
        if let Some(max) = obj.get("maximum").and_then(Value::as_f64) {
            let exclusive = exclusive_max.and_then(Value::as_bool).unwrap_or(false);
            node = node.predicate(Predicate::Maximum { value: max, exclusive });
        }
        if let Some(max) = exclusive_max.and_then(Value::as_f64) {
            node = node.predicate(Predicate::Maximum { value: max, exclusive: true });
        }
        if let Some(divisor) = obj.get("multipleOf").and_then(Value::as_f64) {
            node = node.multiple_of(divisor);
        }

        if let Some(min) = obj.get("minItems").and_then(as_usize) {
            node = node.min_items(min);
        }
        if let Some(max) = obj.get("maxItems").and_then(as_usize) {
            node = node.max_items(max);
        }
        if obj.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            node = node.unique_items();
        }

        Ok(node)
    }
}

fn as_usize(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn parse_kind(name: &str, path: &str) -> ConfigResult<SchemaKind> {
    match name {
        "string" => Ok(SchemaKind::String),
        "number" => Ok(SchemaKind::Number),
        "integer" => Ok(SchemaKind::Integer),
        "boolean" => Ok(SchemaKind::Boolean),
        "array" => Ok(SchemaKind::Array),
        "object" => Ok(SchemaKind::Object),
        other => Err(schema_error(path, format!("unknown type '{other}'"))),
    }
}

fn infer_kind(obj: &Map<String, Value>) -> SchemaKind {
    if obj.contains_key("properties") || obj.contains_key("additionalProperties") {
        SchemaKind::Object
    } else if obj.contains_key("items") {
        SchemaKind::Array
    } else {
        SchemaKind::Any
    }
}
