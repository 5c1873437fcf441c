//! Errors raised while loading configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Malformed configuration: {0}")]
    InvalidFormat(String),

    #[error("Invalid {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable ${{{0}}} is not set")]
    EnvVarNotSet(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
