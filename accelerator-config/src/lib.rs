pub mod config;
pub mod settings;

pub use config::{ConfigError, Configurable};
pub use settings::{
    AcceleratorSettings, BackendSettings, DEFAULT_DENY_HEADERS, DEFAULT_KEY_PREFIX,
};

// re-export
pub use serde;
pub use serde_yaml;
