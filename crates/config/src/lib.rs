pub mod config;
pub mod loader;
pub mod validation;

// self:: keeps the module unambiguous next to the extern `config` crate
pub use self::config::*;
pub use self::loader::*;
pub use self::validation::{validate_config, ValidationError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load configuration: {0}")]
    LoadError(String),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config source error: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("validation failed: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
