//! Manager lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`ConfigManager`](super::ConfigManager)
///
/// `Uninitialized → Loading → Loaded ⇄ Reloading`; a failed load or reload
/// moves to `Errored`, keeping the last good snapshot when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerState {
    /// Constructed, `initialize` not yet called
    Uninitialized,
    /// First pipeline run in progress
    Loading,
    /// A snapshot is committed
    Loaded,
    /// Re-fetching from the provider
    Reloading,
    /// Last load or reload failed
    Errored,
}

impl ManagerState {
    /// Lowercase name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            ManagerState::Uninitialized => "uninitialized",
            ManagerState::Loading => "loading",
            ManagerState::Loaded => "loaded",
            ManagerState::Reloading => "reloading",
            ManagerState::Errored => "errored",
        }
    }

    /// Whether a pipeline run is in flight
    pub fn is_busy(self) -> bool {
        matches!(self, ManagerState::Loading | ManagerState::Reloading)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            ManagerState::Uninitialized => 0,
            ManagerState::Loading => 1,
            ManagerState::Loaded => 2,
            ManagerState::Reloading => 3,
            ManagerState::Errored => 4,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ManagerState::Loading,
            2 => ManagerState::Loaded,
            3 => ManagerState::Reloading,
            4 => ManagerState::Errored,
            _ => ManagerState::Uninitialized,
        }
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
