//! Configuration provider implementations

mod env;
mod file;
mod layered;
mod memory;

pub use env::{DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR, EnvProvider};
pub use file::{FileFormat, FileProvider};
pub use layered::LayeredProvider;
pub use memory::StaticProvider;

// Re-export trait from core for convenience
pub use crate::core::ConfigProvider;
