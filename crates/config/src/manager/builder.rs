//! Builder for [`ConfigManager`]

use super::config_manager::ConfigManager;
use super::options::ManagerOptions;
use super::pipeline::Pipeline;
use crate::core::{ChangeSource, ConfigProvider, ConfigResult};
use crate::loaders::StaticProvider;
use crate::schema::{SchemaNode, SchemaValidator};
use crate::template::{
    FunctionRegistry, FunctionResult, PatternKind, TemplateArg, TemplateContext, TemplateEngine,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ConfigManager`]
///
/// Without a provider the manager serves an empty document, so a schema
/// alone yields its defaults.
pub struct ConfigManagerBuilder {
    provider: Option<Arc<dyn ConfigProvider>>,
    schema: Option<Arc<SchemaNode>>,
    options: ManagerOptions,
    env: Option<HashMap<String, String>>,
    runtime: Map<String, Value>,
    custom: Map<String, Value>,
    functions: FunctionRegistry,
}

impl ConfigManagerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            schema: None,
            options: ManagerOptions::default(),
            env: None,
            runtime: Map::new(),
            custom: Map::new(),
            functions: FunctionRegistry::new(),
        }
    }

    /// Source of raw documents
    #[must_use = "builder methods must be chained or built"]
    pub fn provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Shared source of raw documents
    #[must_use = "builder methods must be chained or built"]
    pub fn shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Serve a fixed document (attributed to `default`)
    #[must_use = "builder methods must be chained or built"]
    pub fn document(self, document: Value) -> Self {
        self.provider(StaticProvider::new(document, ChangeSource::Default))
    }

    /// Schema to validate and default-fill against
    #[must_use = "builder methods must be chained or built"]
    pub fn schema(mut self, schema: impl Into<Arc<SchemaNode>>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Replace all engine options
    #[must_use = "builder methods must be chained or built"]
    pub fn options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Commit invalid documents with warnings
    #[must_use = "builder methods must be chained or built"]
    pub fn permissive(mut self, permissive: bool) -> Self {
        self.options.permissive = permissive;
        self
    }

    /// Memoize reads between commits
    #[must_use = "builder methods must be chained or built"]
    pub fn cache(mut self, cache: bool) -> Self {
        self.options.cache = cache;
        self
    }

    /// Placeholder syntax
    #[must_use = "builder methods must be chained or built"]
    pub fn pattern(mut self, pattern: PatternKind) -> Self {
        self.options.pattern = pattern;
        self
    }

    /// Default timeout for `reload`
    #[must_use = "builder methods must be chained or built"]
    pub fn reload_timeout(mut self, timeout: Duration) -> Self {
        self.options.reload_timeout = Some(timeout);
        self
    }

    /// Use `vars` as the template environment instead of the process env
    #[must_use = "builder methods must be chained or built"]
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .get_or_insert_with(HashMap::new)
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Override or add a runtime fact
    #[must_use = "builder methods must be chained or built"]
    pub fn runtime_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.runtime.insert(key.into(), value.into());
        self
    }

    /// Merge values into the custom namespace
    #[must_use = "builder methods must be chained or built"]
    pub fn custom(mut self, values: Value) -> Self {
        if let Value::Object(values) = values {
            self.custom.extend(values);
        }
        self
    }

    /// Add one custom value
    #[must_use = "builder methods must be chained or built"]
    pub fn custom_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Register an extra template function
    #[must_use = "builder methods must be chained or built"]
    pub fn function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str, &[TemplateArg]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions.register(name, function);
        self
    }

    /// Build the manager without loading anything
    pub fn build(self) -> ConfigManager {
        let context = TemplateContext::builder().runtime(Value::Object(self.runtime));
        let context = match self.env {
            Some(env) => context.env(env),
            None => context.process_env(),
        };
        let context = context
            .default_runtime()
            .custom(Value::Object(self.custom))
            .build();

        let pipeline = Pipeline {
            validator: self.schema.map(SchemaValidator::new),
            engine: TemplateEngine::with_functions(self.functions),
            context,
            options: self.options,
        };
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(StaticProvider::defaults(Value::Object(Map::new()))));

        ConfigManager::from_parts(provider, pipeline)
    }

    /// Build the manager and run `initialize`
    pub async fn load(self) -> ConfigResult<Arc<ConfigManager>> {
        let manager = Arc::new(self.build());
        manager.initialize().await?;
        Ok(manager)
    }
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManagerBuilder")
            .field("provider", &self.provider.as_ref().map(|p| p.describe()))
            .field("has_schema", &self.schema.is_some())
            .field("options", &self.options)
            .field("injected_env", &self.env.as_ref().map(HashMap::len))
            .field("custom_keys", &self.custom.len())
            .finish()
    }
}
