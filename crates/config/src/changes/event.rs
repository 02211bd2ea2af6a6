//! Change events

use crate::core::ChangeSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One leaf whose value differs between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Leaf path
    pub path: String,
    /// Previous value; `None` when the leaf was added
    pub old_value: Option<Value>,
    /// New value; `None` when the leaf was removed
    pub new_value: Option<Value>,
    /// Where the new value came from
    pub source: ChangeSource,
    /// When the change was detected
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Whether the leaf was added
    pub fn is_added(&self) -> bool {
        self.old_value.is_none()
    }

    /// Whether the leaf was removed
    pub fn is_removed(&self) -> bool {
        self.new_value.is_none()
    }
}

/// What subscribers receive for one commit
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    /// The newly committed document
    pub document: Arc<Value>,
    /// Leaf changes, ordered by path
    pub events: Vec<ChangeEvent>,
    /// Snapshot version that produced the notification
    pub version: u64,
}

impl ChangeNotification {
    /// Whether any leaf under `prefix` changed
    pub fn touches(&self, prefix: &str) -> bool {
        self.events.iter().any(|e| {
            e.path == prefix
                || e.path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }
}
