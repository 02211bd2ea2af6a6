//! Manager and mutation options

use crate::template::PatternKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration for a [`ConfigManager`](super::ConfigManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// Commit documents that fail validation or template resolution,
    /// logging the problems instead of rejecting the commit
    pub permissive: bool,

    /// Memoize `get_value` per path between commits
    pub cache: bool,

    /// Placeholder syntax used for resolution
    pub pattern: PatternKind,

    /// Timeout applied by `reload` when none is given
    #[serde(with = "duration_ms", rename = "reload_timeout_ms")]
    pub reload_timeout: Option<Duration>,

    /// Upper bound on resolution passes for chained references
    pub max_resolution_passes: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            permissive: false,
            cache: true,
            pattern: PatternKind::Mustache,
            reload_timeout: None,
            max_resolution_passes: 4,
        }
    }
}

impl ManagerOptions {
    /// Options with permissive commits enabled
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Options for [`ConfigManager::set`](super::ConfigManager::set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetOptions {
    /// Re-validate the whole document instead of only the changed subtree
    pub validate: bool,
}

impl SetOptions {
    /// Validate the whole document
    pub fn validated() -> Self {
        Self { validate: true }
    }
}

/// Options for [`ConfigManager::update`](super::ConfigManager::update)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Re-validate the whole document instead of only the merged top-level
    /// sections
    pub validate: bool,
}

impl UpdateOptions {
    /// Validate the whole document
    pub fn validated() -> Self {
        Self { validate: true }
    }
}
