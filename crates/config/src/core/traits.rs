//! Core traits for configuration system

use super::{ConfigResult, SourcedDocument};
use async_trait::async_trait;

/// Supplies raw configuration documents to the manager
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Fetch the current raw document with its source attribution
    async fn fetch(&self) -> ConfigResult<SourcedDocument>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<P: ConfigProvider + ?Sized> ConfigProvider for std::sync::Arc<P> {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
