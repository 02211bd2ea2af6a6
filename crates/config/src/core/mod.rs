//! Core configuration functionality

pub mod document;
pub mod error;
pub mod path;
pub mod result;
pub mod source;
pub mod traits;

// Re-export core types
pub use error::{ConfigError, ErrorCategory};
pub use path::PathSegment;
pub use result::{ConfigResult, ConfigResultExt};
pub use source::{ChangeSource, SourceMap, SourcedDocument};

// Re-export core traits
pub use traits::ConfigProvider;
