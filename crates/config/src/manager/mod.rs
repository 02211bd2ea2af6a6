//! Configuration manager: lifecycle, commits, reads and hot reload

mod builder;
mod config_manager;
mod options;
mod pipeline;
mod snapshot;
mod state;

pub use builder::ConfigManagerBuilder;
pub use config_manager::ConfigManager;
pub use options::{ManagerOptions, SetOptions, UpdateOptions};
pub use snapshot::Snapshot;
pub use state::ManagerState;
