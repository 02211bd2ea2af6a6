//! Environment variable configuration provider

use crate::core::{ChangeSource, ConfigProvider, ConfigResult, SourcedDocument};
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Default variable prefix
pub const DEFAULT_ENV_PREFIX: &str = "FOLIO";

/// Default separator between nesting levels
pub const DEFAULT_ENV_SEPARATOR: &str = "__";

/// Provider mapping prefixed environment variables onto a nested document
///
/// With the defaults, `FOLIO__SITE__TITLE=Studio` becomes
/// `{ "site": { "title": "Studio" } }`. Keys are lowercased; values are
/// typed as bool, integer, float, JSON array/object or string.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
    separator: String,
    vars: Option<HashMap<String, String>>,
    log_sensitive: bool,
}

impl EnvProvider {
    /// Provider reading the process environment with the default prefix
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_ENV_PREFIX.to_string(),
            separator: DEFAULT_ENV_SEPARATOR.to_string(),
            vars: None,
            log_sensitive: false,
        }
    }

    /// Use a different prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use a different nesting separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Read from `vars` instead of the process environment
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Log values of sensitive-looking keys at trace level
    pub fn with_log_sensitive(mut self, log_sensitive: bool) -> Self {
        self.log_sensitive = log_sensitive;
        self
    }

    fn is_sensitive_key(key: &str) -> bool {
        let key = key.to_lowercase();
        ["password", "secret", "token", "api_key", "private", "credential"]
            .iter()
            .any(|needle| key.contains(needle))
    }

    /// Variables carrying the prefix, with the prefix stripped
    fn matching_vars(&self) -> Vec<(String, String)> {
        let prefix = format!("{}{}", self.prefix.to_uppercase(), self.separator);
        let strip = |(key, value): (String, String)| {
            let upper = key.to_uppercase();
            let rest = upper.strip_prefix(&prefix)?;
            (!rest.is_empty()).then(|| (rest.to_string(), value))
        };

        let mut vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone().into_iter().filter_map(strip).collect(),
            None => std::env::vars().filter_map(strip).collect(),
        };
        // Stable insertion order so conflicting keys resolve deterministically
        vars.sort();
        vars
    }

    fn to_document(&self, vars: Vec<(String, String)>) -> Value {
        let mut root = Map::new();
        for (key, value) in vars {
            if Self::is_sensitive_key(&key) && !self.log_sensitive {
                folio_log::trace!(key = %key, "Loading env config: [REDACTED]");
            } else {
                folio_log::trace!(key = %key, value = %value, "Loading env config");
            }

            let parts: Vec<String> = key
                .split(self.separator.as_str())
                .filter(|part| !part.is_empty())
                .map(str::to_lowercase)
                .collect();
            insert_nested(&mut root, &parts, parse_env_value(&value));
        }
        Value::Object(root)
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_nested(obj: &mut Map<String, Value>, parts: &[String], value: Value) {
    match parts {
        [] => {}
        [last] => {
            obj.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let nested = obj
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !nested.is_object() {
                *nested = Value::Object(Map::new());
            }
            if let Value::Object(nested) = nested {
                insert_nested(nested, rest, value);
            }
        }
    }
}

/// Type a raw variable value
pub(crate) fn parse_env_value(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = value.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = value.parse::<f64>()
        && let Some(num) = Number::from_f64(float)
    {
        return Value::Number(num);
    }
    if ((value.starts_with('{') && value.ends_with('}'))
        || (value.starts_with('[') && value.ends_with(']')))
        && let Ok(json) = serde_json::from_str(value)
    {
        return json;
    }
    Value::String(value.to_string())
}

#[async_trait]
impl ConfigProvider for EnvProvider {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        let vars = self.matching_vars();
        if vars.is_empty() {
            folio_log::debug!(prefix = %self.prefix, "No environment variables found");
        } else {
            folio_log::debug!(
                prefix = %self.prefix,
                count = vars.len(),
                "Loaded environment variables"
            );
        }
        Ok(SourcedDocument::uniform(
            self.to_document(vars),
            ChangeSource::Env,
        ))
    }

    fn describe(&self) -> String {
        format!("env {}{}*", self.prefix, self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("true", json!(true))]
    #[case("FALSE", json!(false))]
    #[case("42", json!(42))]
    #[case("2.5", json!(2.5))]
    #[case(r#"["a","b"]"#, json!(["a", "b"]))]
    #[case(r#"{"k":1}"#, json!({ "k": 1 }))]
    #[case("Design, Build", json!("Design, Build"))]
    #[case("", json!(""))]
    fn test_parse_env_value(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(parse_env_value(raw), expected);
    }

    #[test]
    fn test_is_sensitive_key() {
        assert!(EnvProvider::is_sensitive_key("SMTP__PASSWORD"));
        assert!(EnvProvider::is_sensitive_key("api_key"));
        assert!(!EnvProvider::is_sensitive_key("SITE__TITLE"));
    }

    #[tokio::test]
    async fn test_fetch_nests_by_separator() {
        let provider = EnvProvider::new().with_vars([
            ("FOLIO__SITE__TITLE", "Studio"),
            ("folio__theme__radius", "6"),
            ("FOLIO__FEATURES__BLOG", "true"),
            ("OTHER__SITE__TITLE", "ignored"),
            ("FOLIO__", "ignored"),
        ]);
        let doc = provider.fetch().await.unwrap();
        assert_eq!(
            doc.document,
            json!({
                "site": { "title": "Studio" },
                "theme": { "radius": 6 },
                "features": { "blog": true }
            })
        );
        assert_eq!(doc.sources.lookup("site.title"), ChangeSource::Env);
    }

    #[tokio::test]
    async fn test_custom_prefix_and_separator() {
        let provider = EnvProvider::new()
            .with_prefix("site")
            .with_separator("_")
            .with_vars([("SITE_SEO_TITLE", "Home")]);
        let doc = provider.fetch().await.unwrap();
        assert_eq!(doc.document, json!({ "seo": { "title": "Home" } }));
        assert_eq!(provider.describe(), "env site_*");
    }

    #[tokio::test]
    async fn test_scalar_replaced_by_nested_key() {
        let provider = EnvProvider::new().with_vars([
            ("FOLIO__THEME", "dark"),
            ("FOLIO__THEME__MODE", "dark"),
        ]);
        let doc = provider.fetch().await.unwrap();
        assert_eq!(doc.document, json!({ "theme": { "mode": "dark" } }));
    }
}
