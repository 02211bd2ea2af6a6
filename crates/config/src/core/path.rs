//! Dotted/bracketed path addressing over a configuration tree
//!
//! Paths are dot-separated keys, each optionally followed by bracketed
//! non-negative indices: `skills.items[2].name`. The empty path addresses
//! the root.

use super::document::json_type_name;
use super::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object field
    Key(String),
    /// Sequence element
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Parse a path string into segments
///
/// Keys containing `.`, `[` or `]` (and the empty key) are written as
/// bracketed JSON strings: `links["example.com"].label`.
pub fn parse_path(path: &str) -> ConfigResult<Vec<PathSegment>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut rest = path;
    let mut expect_key = true;
    loop {
        if expect_key && !rest.starts_with("[\"") {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let key = &rest[..end];
            if key.is_empty() {
                return Err(ConfigError::invalid_path(path, "empty segment"));
            }
            segments.push(PathSegment::Key(key.to_string()));
            rest = &rest[end..];
        }
        expect_key = false;

        if let Some(tail) = rest.strip_prefix('.') {
            expect_key = true;
            rest = tail;
            continue;
        }
        let Some(inner) = rest.strip_prefix('[') else {
            if rest.is_empty() {
                break;
            }
            return Err(ConfigError::invalid_path(
                path,
                format!("unexpected '{rest}' after index"),
            ));
        };
        let (segment, tail) =
            parse_bracket(inner).map_err(|message| ConfigError::invalid_path(path, message))?;
        segments.push(segment);
        rest = tail;
    }

    Ok(segments)
}

/// One bracketed segment, `inner` starting just after `[`
fn parse_bracket(inner: &str) -> Result<(PathSegment, &str), String> {
    if inner.starts_with('"') {
        let end = closing_quote(inner).ok_or("unterminated quoted key")?;
        let key: String = serde_json::from_str(&inner[..=end])
            .map_err(|e| format!("invalid quoted key: {e}"))?;
        let tail = inner[end + 1..]
            .strip_prefix(']')
            .ok_or("quoted key must be followed by ']'")?;
        return Ok((PathSegment::Key(key), tail));
    }

    let close = inner.find(']').ok_or("unclosed index")?;
    let digits = &inner[..close];
    let index = parse_index(digits)
        .ok_or_else(|| format!("index '{digits}' is not a non-negative integer"))?;
    Ok((PathSegment::Index(index), &inner[close + 1..]))
}

fn closing_quote(quoted: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, byte) in quoted.bytes().enumerate().skip(1) {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether `key` must be written in bracketed, quoted form
pub fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']'])
}

/// Append one key segment to a formatted path
pub fn push_key(out: &mut String, key: &str) {
    if needs_quoting(key) {
        out.push('[');
        out.push_str(&Value::String(key.to_string()).to_string());
        out.push(']');
    } else {
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(key);
    }
}

/// Read the value at `path`
///
/// Missing intermediates, shape mismatches, out-of-range indices and
/// malformed paths all yield `None`.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    get_segments(tree, &segments)
}

/// Read the value at already-parsed segments
pub fn get_segments<'a>(tree: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(tree, |node, segment| match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

/// Largest number of `null` slots one `set` may pad a sequence with
pub const MAX_SPARSE_GAP: usize = 1024;

/// Return a copy of `tree` with `value` stored at `path`
///
/// Missing (or `null`) intermediates are created: objects for key segments,
/// sequences for indexed ones. Indexing past the end pads the sequence with
/// `null` up to the target index, at most [`MAX_SPARSE_GAP`] slots.
pub fn set(tree: &Value, path: &str, value: Value) -> ConfigResult<Value> {
    let segments = parse_path(path)?;
    let mut updated = tree.clone();
    set_in(&mut updated, &segments, value)
        .map_err(|message| ConfigError::invalid_path(path, message))?;
    Ok(updated)
}

fn set_in(node: &mut Value, segments: &[PathSegment], value: Value) -> Result<(), String> {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };

    match first {
        PathSegment::Key(key) => {
            if node.is_null() {
                *node = Value::Object(Map::new());
            }
            match node {
                Value::Object(map) => {
                    let child = map.entry(key.clone()).or_insert(Value::Null);
                    set_in(child, rest, value)
                }
                other => Err(format!(
                    "cannot descend by key '{key}' into {}",
                    json_type_name(other)
                )),
            }
        }
        PathSegment::Index(index) => {
            if node.is_null() {
                *node = Value::Array(Vec::new());
            }
            match node {
                Value::Array(items) => {
                    if *index > items.len().saturating_add(MAX_SPARSE_GAP) {
                        return Err(format!(
                            "index [{index}] is more than {MAX_SPARSE_GAP} past the end of a sequence of {}",
                            items.len()
                        ));
                    }
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::Null);
                    }
                    set_in(&mut items[*index], rest, value)
                }
                other => Err(format!(
                    "cannot index [{index}] into {}",
                    json_type_name(other)
                )),
            }
        }
    }
}

/// Render segments back into path syntax
pub fn format_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => push_key(&mut out, key),
            PathSegment::Index(index) => {
                out.push_str(&format!("[{index}]"));
            }
        }
    }
    out
}
