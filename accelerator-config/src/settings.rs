//! Typed accelerator settings.
//!
//! Read from the `accelerator` section of a YAML config:
//!
//! ```yaml
//! accelerator:
//!   key_prefix: "acc."
//!   deny_headers: [Set-Cookie]
//!   store_errors_as_miss: false
//!   backend:
//!     kind: redis
//!     uri: "redis://127.0.0.1:6379"
//! ```

use serde::Deserialize;
use std::path;
use tracing::debug;

use crate::{ConfigError, Configurable};

pub const DEFAULT_KEY_PREFIX: &str = "acc.";
pub const DEFAULT_DENY_HEADERS: &[&str] = &["Set-Cookie"];
pub const SECTION: &str = "accelerator";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendSettings {
    #[default]
    Memory,
    Redis { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AcceleratorSettings {
    /// Namespace for keys written to a shared backend
    pub key_prefix: String,
    /// Response header names that make a response uncacheable
    pub deny_headers: Vec<String>,
    /// Treat store failures as cache misses instead of failing the request
    pub store_errors_as_miss: bool,
    pub backend: BackendSettings,
}

impl Default for AcceleratorSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            deny_headers: DEFAULT_DENY_HEADERS.iter().map(|h| h.to_string()).collect(),
            store_errors_as_miss: false,
            backend: BackendSettings::default(),
        }
    }
}

impl AcceleratorSettings {
    /// Load the `accelerator` section of a YAML file. A file without that
    /// section yields the defaults.
    pub fn from_yaml_file(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<Self, ConfigError> {
        let file = SettingsFile {
            config: SettingsFile::load_config(config_file_path)?,
        };
        let settings = match file.get_config_section::<Self>(SECTION) {
            Ok(settings) => settings,
            Err(ConfigError::MissingSection(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        settings.validate()?;
        debug!(backend = ?settings.backend, "loaded accelerator settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BackendSettings::Redis { uri } = &self.backend {
            if uri.trim().is_empty() {
                return Err(ConfigError::Invalid("redis backend needs a uri".to_string()));
            }
            if self.key_prefix.is_empty() {
                return Err(ConfigError::Invalid(
                    "redis backend needs a non-empty key_prefix".to_string(),
                ));
            }
        }
        if self.deny_headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid("empty header name in deny_headers".to_string()));
        }
        Ok(())
    }
}

struct SettingsFile {
    config: serde_yaml::Value,
}

impl Configurable for SettingsFile {
    fn config(&self) -> &serde_yaml::Value {
        &self.config
    }
}
