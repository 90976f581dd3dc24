use error_common::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid package key: {0:?}")]
    InvalidKey(String),

    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    #[error("Upload exceeds the size limit: {0}")]
    UploadTooLarge(String),

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error during {operation}: {message}")]
    Backend { operation: String, message: String },
}

impl StorageError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn backend(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => RegistryError::NotFound(format!("package {key}")),
            StorageError::InvalidKey(key) => RegistryError::validation(format!("invalid package key {key:?}")),
            StorageError::InvalidUpload(message) => RegistryError::validation(format!("malformed upload: {message}")),
            StorageError::UploadTooLarge(message) => RegistryError::PayloadTooLarge(message),
            StorageError::Io { operation, source } => RegistryError::storage(operation, source),
            StorageError::Backend { operation, message } => RegistryError::storage(operation, message),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
