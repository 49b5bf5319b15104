//! Configuration for the Read To Me backend
//!
//! Layered loading, highest priority first:
//! 1. Environment variables (`RTM__` prefix, `__` separator)
//! 2. `config/{env}.yaml` (if an environment name is given)
//! 3. `config/default.yaml`

mod settings;

pub use settings::{
    load_settings, ObservabilityConfig, ServerConfig, Settings, TtsConfigDefaults,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
