//! Watcher-specific types and events

use notify::EventKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Debounced change to a watched file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// What happened, as of the last raw event in the window
    pub kind: WatchEventKind,

    /// Watched file that changed
    pub path: PathBuf,

    /// When the debounce window closed
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl WatchEvent {
    /// Create an event stamped now
    pub fn new(kind: WatchEventKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Kind of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventKind {
    /// File created (or replaced by rename)
    Created,
    /// File contents or metadata modified
    Modified,
    /// File removed
    Removed,
}

impl WatchEventKind {
    /// Map a raw notify event kind; access and unknown events are ignored
    pub(crate) fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}
