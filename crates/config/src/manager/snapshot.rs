//! Committed configuration snapshots

use crate::core::SourceMap;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// One committed, fully resolved document
///
/// Snapshots are immutable; every commit swaps in a new one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) raw: Arc<Value>,
    pub(crate) resolved: Arc<Value>,
    pub(crate) sources: SourceMap,
    pub(crate) version: u64,
    pub(crate) committed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Resolved document as consumers see it
    pub fn document(&self) -> &Arc<Value> {
        &self.resolved
    }

    /// Validated, default-filled document before template resolution
    pub fn raw(&self) -> &Arc<Value> {
        &self.raw
    }

    /// Per-path source attribution
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Monotonic commit counter, starting at 1
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was committed
    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }
}
