//! In-memory configuration provider

use crate::core::{ChangeSource, ConfigProvider, ConfigResult, SourcedDocument};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

/// Provider serving a document held in memory
///
/// Used for defaults and tests; [`StaticProvider::replace`] swaps the
/// document seen by the next fetch.
#[derive(Debug)]
pub struct StaticProvider {
    document: RwLock<Value>,
    source: ChangeSource,
}

impl StaticProvider {
    /// Provider attributing `document` to `source`
    pub fn new(document: Value, source: ChangeSource) -> Self {
        Self {
            document: RwLock::new(document),
            source,
        }
    }

    /// Provider for default values
    pub fn defaults(document: Value) -> Self {
        Self::new(document, ChangeSource::Default)
    }

    /// Swap the served document
    pub fn replace(&self, document: Value) {
        *self.document.write() = document;
    }

    /// Copy of the served document
    pub fn document(&self) -> Value {
        self.document.read().clone()
    }
}

#[async_trait]
impl ConfigProvider for StaticProvider {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        Ok(SourcedDocument::uniform(self.document(), self.source))
    }

    fn describe(&self) -> String {
        format!("static ({})", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_and_replace() {
        let provider = StaticProvider::defaults(json!({ "a": 1 }));
        let first = provider.fetch().await.unwrap();
        assert_eq!(first.document, json!({ "a": 1 }));
        assert_eq!(first.sources.lookup("a"), ChangeSource::Default);

        provider.replace(json!({ "a": 2 }));
        assert_eq!(provider.fetch().await.unwrap().document, json!({ "a": 2 }));
        assert_eq!(provider.describe(), "static (default)");
    }
}
