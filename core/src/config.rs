//! Client configuration.
//!
//! [`ApiConfig`] describes the API as a whole and can be loaded from TOML;
//! every field has a compiled default so a partial file is valid.
//! [`ResourceConfig`] is the immutable per-resource configuration a
//! [`ResourceClient`](crate::client::ResourceClient) is built from.
//!
//! ```toml
//! base_url = "https://a.example.com/api/v1"
//! correlation_header = "x-client-request-id"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::correlation;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value parsed but is unusable.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the API; resource paths are appended to it.
    pub base_url: String,
    /// Header carrying the per-request correlation id.
    pub correlation_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            correlation_header: correlation::DEFAULT_HEADER.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is not valid TOML or a value
    /// is unusable.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Configuration for one resource type under this API.
    pub fn resource(&self, path: &str, type_tag: &str) -> ResourceConfig {
        ResourceConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            path: format!("/{}", path.trim_matches('/')),
            type_tag: type_tag.to_string(),
            correlation_header: self.correlation_header.clone(),
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    reason: "must be an absolute http(s) URL".to_string(),
                })
            }
        }
        if self.correlation_header.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "correlation_header",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Immutable configuration of a single resource client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub base_url: String,
    /// Resource path, always with a single leading slash (e.g. `/subtasks`).
    pub path: String,
    /// Resource type tag as reported in payloads (e.g. `subtask`).
    pub type_tag: String,
    pub correlation_header: String,
}

impl ResourceConfig {
    /// Absolute URL of the collection.
    pub fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}
