//! # Folio Log
//!
//! Logging setup shared by the folio crates. Library code logs through the
//! re-exported `tracing` macros; binaries pick a [`Config`] preset and call one
//! of the init functions once at startup.
//!
//! ```rust,no_run
//! use folio_log::prelude::*;
//!
//! fn main() -> LogResult<()> {
//!     let _guard = folio_log::auto_init()?;
//!     info!(port = 8080, "Server starting");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard, ReloadHandle};
pub use config::{Config, DisplayConfig, Format, Level, WriterConfig};
pub use error::{LogError, LogResult};

// Re-export tracing macros
pub use tracing::{debug, error, info, instrument, span, trace, warn};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Level, LogError, LogResult, auto_init, debug, error, info, init, init_with, trace, warn,
    };

    pub use tracing::{Span, field};
}

/// Environment variable holding the filter directive (falls back to `RUST_LOG`).
pub const LOG_ENV: &str = "FOLIO_LOG";

/// Pick a configuration from the environment and build type, then install it.
///
/// `FOLIO_LOG` / `RUST_LOG` select [`Config::from_env`]; otherwise debug builds
/// get [`Config::development`] and release builds [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    if std::env::var(LOG_ENV).is_ok() || std::env::var("RUST_LOG").is_ok() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialize with default configuration
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests; a no-op when a global subscriber is already set.
pub fn init_test() -> LogResult<LoggerGuard> {
    if tracing::dispatcher::has_been_set() {
        return Ok(LoggerGuard::noop());
    }
    match init_with(Config::test()) {
        // another test thread won the race
        Err(LogError::AlreadyInitialized(_)) => Ok(LoggerGuard::noop()),
        other => other,
    }
}
