//! Leaf-level snapshot diffing

use super::event::ChangeEvent;
use crate::core::document::leaves;
use crate::core::{ChangeSource, SourceMap};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;

/// Diff two documents, attributing every change to `source`
pub fn diff(old: &Value, new: &Value, source: ChangeSource) -> Vec<ChangeEvent> {
    diff_with_sources(old, new, &SourceMap::uniform(source))
}

/// Diff two documents, attributing each change through `sources`
///
/// Leaves are scalars and empty containers. Output is ordered by path.
pub fn diff_with_sources(old: &Value, new: &Value, sources: &SourceMap) -> Vec<ChangeEvent> {
    if old == new {
        return Vec::new();
    }

    let old_leaves = leaves(old);
    let new_leaves = leaves(new);
    let timestamp = Utc::now();

    let paths: BTreeSet<&String> = old_leaves.keys().chain(new_leaves.keys()).collect();
    paths
        .into_iter()
        .filter_map(|path| {
            let before = old_leaves.get(path).copied();
            let after = new_leaves.get(path).copied();
            (before != after).then(|| ChangeEvent {
                path: path.clone(),
                old_value: before.cloned(),
                new_value: after.cloned(),
                source: sources.lookup(path),
                timestamp,
            })
        })
        .collect()
}
