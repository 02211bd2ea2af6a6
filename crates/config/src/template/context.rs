//! Lookup namespaces for template resolution

use crate::core::document::stringify;
use crate::core::path;
use chrono::{Datelike, Utc};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Namespaces consulted while resolving placeholders
///
/// Immutable once built; a fresh context is built for every resolution
/// pass.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    config: Arc<Value>,
    env: Arc<HashMap<String, String>>,
    runtime: Value,
    custom: Value,
}

impl TemplateContext {
    /// Start building a context
    pub fn builder() -> TemplateContextBuilder {
        TemplateContextBuilder::default()
    }

    /// Configuration namespace
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Environment namespace
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Runtime facts
    pub fn runtime(&self) -> &Value {
        &self.runtime
    }

    /// Custom namespace
    pub fn custom(&self) -> &Value {
        &self.custom
    }

    /// Same namespaces over a different configuration document
    pub fn with_config(&self, config: impl Into<Arc<Value>>) -> Self {
        Self {
            config: config.into(),
            env: Arc::clone(&self.env),
            runtime: self.runtime.clone(),
            custom: self.custom.clone(),
        }
    }

    /// Resolve a variable path to its string form
    ///
    /// `env.`, `runtime.` and `custom.` select one namespace. Bare paths try
    /// config, then custom, then a raw environment key. `null` counts as
    /// undefined.
    pub fn lookup(&self, variable: &str) -> Option<String> {
        if let Some(key) = variable.strip_prefix("env.") {
            return self.env.get(key).cloned();
        }
        if let Some(rest) = variable.strip_prefix("runtime.") {
            return defined(path::get(&self.runtime, rest)).map(stringify);
        }
        if let Some(rest) = variable.strip_prefix("custom.") {
            return defined(path::get(&self.custom, rest)).map(stringify);
        }

        defined(path::get(&self.config, variable))
            .or_else(|| defined(path::get(&self.custom, variable)))
            .map(stringify)
            .or_else(|| self.env.get(variable).cloned())
    }
}

fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Facts available under `runtime.` unless overridden
pub fn default_runtime_facts() -> Value {
    let now = Utc::now();
    json!({
        "year": now.year(),
        "date": now.format("%Y-%m-%d").to_string(),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "engine_version": env!("CARGO_PKG_VERSION"),
    })
}

/// Builder for [`TemplateContext`]
#[derive(Debug, Clone, Default)]
pub struct TemplateContextBuilder {
    config: Arc<Value>,
    env: HashMap<String, String>,
    runtime: Map<String, Value>,
    custom: Map<String, Value>,
}

impl TemplateContextBuilder {
    /// Configuration namespace
    pub fn config(mut self, config: impl Into<Arc<Value>>) -> Self {
        self.config = config.into();
        self
    }

    /// Replace the environment namespace
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Add one environment entry
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Load the process environment
    pub fn process_env(mut self) -> Self {
        self.env.extend(std::env::vars());
        self
    }

    /// Merge runtime facts (top-level keys of `facts` win)
    pub fn runtime(mut self, facts: Value) -> Self {
        if let Value::Object(facts) = facts {
            self.runtime.extend(facts);
        }
        self
    }

    /// Add one runtime fact
    pub fn runtime_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.runtime.insert(key.into(), value.into());
        self
    }

    /// Seed runtime facts with [`default_runtime_facts`]
    pub fn default_runtime(mut self) -> Self {
        if let Value::Object(defaults) = default_runtime_facts() {
            for (key, value) in defaults {
                self.runtime.entry(key).or_insert(value);
            }
        }
        self
    }

    /// Merge custom values (top-level keys of `values` win)
    pub fn custom(mut self, values: Value) -> Self {
        if let Value::Object(values) = values {
            self.custom.extend(values);
        }
        self
    }

    /// Add one custom value
    pub fn custom_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Finish
    pub fn build(self) -> TemplateContext {
        TemplateContext {
            config: self.config,
            env: Arc::new(self.env),
            runtime: Value::Object(self.runtime),
            custom: Value::Object(self.custom),
        }
    }
}
