//! Layered provider merging several providers in priority order

use crate::core::document::{leaves, merge_json};
use crate::core::{ConfigProvider, ConfigResult, SourceMap, SourcedDocument};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

struct Layer {
    provider: Arc<dyn ConfigProvider>,
    optional: bool,
}

/// Provider deep-merging its layers, later layers winning
///
/// Layers are fetched concurrently. A failing optional layer is skipped
/// with a warning; a failing required layer fails the whole fetch.
pub struct LayeredProvider {
    layers: Vec<Layer>,
}

impl std::fmt::Debug for LayeredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredProvider")
            .field("layers", &format!("{} layers", self.layers.len()))
            .finish()
    }
}

impl LayeredProvider {
    /// Empty provider; fetching yields `{}`
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a required layer
    #[must_use = "builder methods must be chained or built"]
    pub fn layer<P: ConfigProvider + 'static>(self, provider: P) -> Self {
        self.shared_layer(Arc::new(provider), false)
    }

    /// Add a layer whose failure is tolerated
    #[must_use = "builder methods must be chained or built"]
    pub fn optional_layer<P: ConfigProvider + 'static>(self, provider: P) -> Self {
        self.shared_layer(Arc::new(provider), true)
    }

    /// Add a shared layer
    #[must_use = "builder methods must be chained or built"]
    pub fn shared_layer(mut self, provider: Arc<dyn ConfigProvider>, optional: bool) -> Self {
        self.layers.push(Layer { provider, optional });
        self
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layers were added
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for LayeredProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigProvider for LayeredProvider {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        let started = Instant::now();
        let fetched = join_all(self.layers.iter().map(|layer| layer.provider.fetch())).await;

        let mut document = Value::Object(Map::new());
        let mut sources = SourceMap::default();
        let mut merged = 0usize;

        for (layer, result) in self.layers.iter().zip(fetched) {
            match result {
                Ok(layer_doc) => {
                    for path in leaves(&layer_doc.document).into_keys() {
                        let source = layer_doc.sources.lookup(&path);
                        sources.insert(path, source);
                    }
                    merge_json(&mut document, layer_doc.document);
                    merged += 1;
                }
                Err(e) if layer.optional => {
                    folio_log::warn!(
                        source = %layer.provider.describe(),
                        error = %e,
                        "Optional configuration layer unavailable; skipping"
                    );
                }
                Err(e) => {
                    folio_log::error!(
                        source = %layer.provider.describe(),
                        error = %e,
                        "Required configuration layer failed"
                    );
                    return Err(e);
                }
            }
        }

        folio_log::debug!(
            layers = self.layers.len(),
            merged,
            elapsed = ?started.elapsed(),
            "Merged configuration layers"
        );
        Ok(SourcedDocument { document, sources })
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.layers.iter().map(|l| l.provider.describe()).collect();
        format!("layered [{}]", names.join(", "))
    }
}
