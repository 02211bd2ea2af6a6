//! Source attribution for configuration values

use super::document::leaves;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where a configuration value came from
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    /// Configuration file
    File,
    /// Environment variables
    Env,
    /// Defaults (static documents or schema defaults)
    Default,
    /// Programmatic `set`/`update` calls
    Runtime,
}

impl ChangeSource {
    /// Lowercase name used in logs and event payloads
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeSource::File => "file",
            ChangeSource::Env => "env",
            ChangeSource::Default => "default",
            ChangeSource::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort mapping from paths to the source that supplied them
///
/// Lookups fall back to the longest recorded prefix of the path, then to
/// the map's fallback source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    fallback: ChangeSource,
    entries: BTreeMap<String, ChangeSource>,
}

impl SourceMap {
    /// Map attributing every path to one source
    pub fn uniform(source: ChangeSource) -> Self {
        Self {
            fallback: source,
            entries: BTreeMap::new(),
        }
    }

    /// Attribute `path` (and everything below it) to `source`
    pub fn insert(&mut self, path: impl Into<String>, source: ChangeSource) {
        self.entries.insert(path.into(), source);
    }

    /// Attribute every leaf of `document` to `source`
    pub fn record_leaves(&mut self, document: &Value, source: ChangeSource) {
        for path in leaves(document).into_keys() {
            self.entries.insert(path, source);
        }
    }

    /// Attribute the whole document to `source`, dropping finer entries
    pub fn reset(&mut self, source: ChangeSource) {
        self.fallback = source;
        self.entries.clear();
    }

    /// Source for `path`
    pub fn lookup(&self, path: &str) -> ChangeSource {
        let mut candidate = path;
        loop {
            if let Some(source) = self.entries.get(candidate) {
                return *source;
            }
            match candidate.rfind(['.', '[']) {
                Some(pos) => candidate = &candidate[..pos],
                None => return self.fallback,
            }
        }
    }

    /// Number of explicit entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether only the fallback applies
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::uniform(ChangeSource::Default)
    }
}

/// A raw document together with its source attribution
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedDocument {
    /// Raw, unvalidated document
    pub document: Value,
    /// Per-path attribution
    pub sources: SourceMap,
}

impl SourcedDocument {
    /// Document attributed entirely to one source
    pub fn uniform(document: Value, source: ChangeSource) -> Self {
        Self {
            document,
            sources: SourceMap::uniform(source),
        }
    }
}
