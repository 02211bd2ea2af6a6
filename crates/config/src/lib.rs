//! Folio Config - configuration resolution for a portfolio site
//!
//! Raw documents come from providers (files, environment, memory), are
//! validated and default-filled against a schema tree, have their
//! placeholders resolved, and are committed as immutable snapshots.
//! Subscribers receive leaf-level change events for every commit.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_config::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> ConfigResult<()> {
//!     let manager = ConfigManager::builder()
//!         .provider(
//!             LayeredProvider::new()
//!                 .layer(FileProvider::new("site.toml"))
//!                 .optional_layer(EnvProvider::new()),
//!         )
//!         .schema(folio_config::portfolio::schema())
//!         .load()
//!         .await?;
//!
//!     let title: String = manager.get("seo.title")?;
//!     let _sub = manager.on_change(|batch| {
//!         for event in &batch.events {
//!             println!("{} changed ({})", event.path, event.source);
//!         }
//!     });
//!     manager.set("theme.mode", "dark", SetOptions::default()).await?;
//!     println!("{title}");
//!     Ok(())
//! }
//! ```

#![deny(unused_must_use)]
#![warn(missing_docs)]

// Core module with shared types and the path resolver
pub mod core;

// Pipeline stages
pub mod changes;
pub mod schema;
pub mod template;

// Implementation modules
pub mod loaders;
pub mod manager;
pub mod portfolio;
pub mod watchers;

// Re-export main types from core
pub use core::{
    ChangeSource, ConfigError, ConfigProvider, ConfigResult, ConfigResultExt, ErrorCategory,
    PathSegment, SourceMap, SourcedDocument,
};

pub use changes::{ChangeEvent, ChangeNotification, ChangeNotifier, ChangeReceiver, Subscription};
pub use loaders::{EnvProvider, FileFormat, FileProvider, LayeredProvider, StaticProvider};
pub use manager::{
    ConfigManager, ConfigManagerBuilder, ManagerOptions, ManagerState, SetOptions, Snapshot,
    UpdateOptions,
};
pub use schema::{SchemaNode, SchemaValidator, StringFormat, ValidationIssue, ValidationResult};
pub use template::{PatternKind, TemplateContext, TemplateEngine, TemplateIssue};
pub use watchers::{FileWatcher, WatchEvent, WatchEventKind};

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude for common imports
    //!
    //! # Example
    //! ```rust
    //! use folio_config::prelude::*;
    //! ```

    // Core types
    pub use crate::core::{
        ChangeSource, ConfigError, ConfigProvider, ConfigResult, ConfigResultExt, SourcedDocument,
    };

    // Manager
    pub use crate::manager::{
        ConfigManager, ConfigManagerBuilder, ManagerOptions, ManagerState, SetOptions,
        UpdateOptions,
    };

    // Pipeline stages
    pub use crate::changes::{ChangeEvent, ChangeNotification, Subscription};
    pub use crate::schema::{SchemaNode, SchemaValidator, StringFormat};
    pub use crate::template::{PatternKind, TemplateContext, TemplateEngine};

    // Common providers
    pub use crate::loaders::{EnvProvider, FileProvider, LayeredProvider, StaticProvider};

    pub use folio_log::{debug, error, info, warn};
}

/// Builder pattern helpers
pub mod builders {
    //! Preconfigured manager builders

    use crate::loaders::{EnvProvider, FileProvider, LayeredProvider};
    use crate::manager::ConfigManagerBuilder;
    use crate::portfolio;
    use std::path::PathBuf;

    /// Manager reading one JSON or TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> ConfigManagerBuilder {
        ConfigManagerBuilder::new().provider(FileProvider::new(path))
    }

    /// Manager reading `FOLIO__*` environment variables
    pub fn from_env() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new().provider(EnvProvider::new())
    }

    /// Portfolio site: config file, then environment overrides, validated
    /// against [`portfolio::schema`]
    pub fn portfolio_site(config_file: impl Into<PathBuf>) -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
            .provider(
                LayeredProvider::new()
                    .layer(FileProvider::new(config_file))
                    .optional_layer(EnvProvider::new()),
            )
            .schema(portfolio::schema())
    }
}
