//! Configuration file watching

mod file;
mod types;

pub use file::FileWatcher;
pub use types::{WatchEvent, WatchEventKind};
