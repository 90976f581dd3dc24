use std::path::PathBuf;

use error_common::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Configuration parsing failed: {0}")]
    Parse(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Failed reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        RegistryError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
