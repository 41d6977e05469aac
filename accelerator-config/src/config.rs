use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Missing config section: {0}")]
    MissingSection(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub trait Configurable {
    fn config(&self) -> &serde_yaml::Value;

    // read configuration from yaml config
    fn load_config(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<serde_yaml::Value, ConfigError> {
        let content: String = fs::read_to_string(config_file_path)?;
        let config: serde_yaml::Value = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Extract Value from config using dot notation i.e. "accelerator.key_prefix"
    fn get_config_value(&self, key: &str) -> Option<&serde_yaml::Value> {
        let keys: Vec<&str> = key.split('.').collect();
        Self::get_value_recursive(self.config(), &keys)
    }

    /// Deserialize the section found at `key` into a typed value.
    fn get_config_section<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self
            .get_config_value(key)
            .ok_or_else(|| ConfigError::MissingSection(key.to_string()))?;
        Ok(serde_yaml::from_value(value.clone())?)
    }

    fn get_value_recursive<'a>(
        config: &'a serde_yaml::Value,
        keys: &[&str],
    ) -> Option<&'a serde_yaml::Value> {
        if keys.is_empty() {
            return None;
        };

        match config {
            serde_yaml::Value::Mapping(map) => {
                let key = keys[0];
                let remaining_keys = &keys[1..];

                if let Some(value) =
                    map.get(serde_yaml::Value::String(key.to_string()))
                {
                    if remaining_keys.is_empty() {
                        Some(value)
                    } else {
                        Self::get_value_recursive(value, remaining_keys)
                    }
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
