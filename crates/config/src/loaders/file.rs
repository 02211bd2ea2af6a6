//! File-based configuration provider

use crate::core::{ChangeSource, ConfigError, ConfigProvider, ConfigResult, SourcedDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Configuration file format
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// JSON
    Json,
    /// TOML
    #[cfg(feature = "toml")]
    Toml,
}

impl FileFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            #[cfg(feature = "toml")]
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }

    /// Parse `content` into a document
    pub fn parse(self, content: &str, origin: &str) -> ConfigResult<Value> {
        match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| {
                ConfigError::parse_error(origin, format!("JSON parse error: {e}"))
            }),
            #[cfg(feature = "toml")]
            FileFormat::Toml => toml::from_str::<Value>(content).map_err(|e| {
                ConfigError::parse_error(origin, format!("TOML parse error: {e}"))
            }),
        }
    }
}

/// Provider reading one JSON or TOML file
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    format: Option<FileFormat>,
}

impl FileProvider {
    /// Provider for `path`, format detected from the extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
        }
    }

    /// Force a format regardless of extension
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Watched path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl ConfigProvider for FileProvider {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        let origin = self.origin();
        let format = self
            .format
            .or_else(|| FileFormat::from_path(&self.path))
            .ok_or_else(|| {
                ConfigError::parse_error(&origin, "unsupported file extension (expected .json or .toml)")
            })?;

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::source_unavailable(&origin, e.to_string()))?;

        let document = format.parse(&content, &origin)?;
        folio_log::debug!(
            action = "load",
            source = %origin,
            format = ?format,
            bytes = content.len(),
            "Loaded configuration file"
        );
        Ok(SourcedDocument::uniform(document, ChangeSource::File))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_json_file() {
        let file = write_temp(".json", r#"{ "personal": { "name": "Jane" } }"#);
        let doc = FileProvider::new(file.path()).fetch().await.unwrap();
        assert_eq!(doc.document, json!({ "personal": { "name": "Jane" } }));
        assert_eq!(doc.sources.lookup("personal.name"), ChangeSource::File);
    }

    #[cfg(feature = "toml")]
    #[tokio::test]
    async fn test_toml_file() {
        let file = write_temp(".toml", "[theme]\nmode = \"dark\"\nradius = 6\n");
        let doc = FileProvider::new(file.path()).fetch().await.unwrap();
        assert_eq!(doc.document, json!({ "theme": { "mode": "dark", "radius": 6 } }));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileProvider::new(dir.path().join("absent.json"))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_bad_content_and_extension() {
        let file = write_temp(".json", "{ nope");
        let err = FileProvider::new(file.path()).fetch().await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let file = write_temp(".ini", "a=1");
        let err = FileProvider::new(file.path()).fetch().await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let file = write_temp(".conf", r#"{"a":1}"#);
        let forced = FileProvider::new(file.path()).with_format(FileFormat::Json);
        assert_eq!(forced.fetch().await.unwrap().document, json!({ "a": 1 }));
    }
}
