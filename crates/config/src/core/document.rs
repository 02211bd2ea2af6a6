//! Helpers over `serde_json::Value` documents

use serde_json::Value;
use std::collections::BTreeMap;

/// Get human-readable type name for a JSON value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deep merge `overlay` into `target`
///
/// Objects merge key-wise; every other pairing (arrays included) is replaced
/// wholesale by the overlay.
pub fn merge_json(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(target_obj), Value::Object(overlay_obj)) => {
            for (key, value) in overlay_obj {
                match target_obj.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target_obj.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

/// Join an object key onto a path prefix
///
/// Keys that would be ambiguous in path syntax are quoted, so distinct
/// leaves never share a path.
pub fn child_key_path(prefix: &str, key: &str) -> String {
    let mut path = prefix.to_string();
    super::path::push_key(&mut path, key);
    path
}

/// Join a sequence index onto a path prefix
pub fn child_index_path(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Flatten a document into its leaves keyed by path
///
/// Leaves are scalars (including `null`) and empty containers.
pub fn leaves(value: &Value) -> BTreeMap<String, &Value> {
    let mut out = BTreeMap::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into<'a>(prefix: &str, value: &'a Value, out: &mut BTreeMap<String, &'a Value>) {
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (key, child) in obj {
                flatten_into(&child_key_path(prefix, key), child, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&child_index_path(prefix, index), child, out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value);
        }
    }
}

/// Render a value the way templates and diagnostics see it
///
/// Strings are verbatim, other scalars use their display form and
/// containers become compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
