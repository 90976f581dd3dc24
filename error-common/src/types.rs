use thiserror::Error;

use crate::codes;

/// Error taxonomy shared by every crate of the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Authorization header present but not of the form `Bearer <token>`
    #[error("invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Missing identity, or the identity service rejected the token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Verified identity lacking every privileged scope
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The identity service connection could not be established
    #[error("identity service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Malformed manifest or missing required identifiers
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Request body over the configured upload limit
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Object-storage or repository failure, with the failing operation
    #[error("storage error during {operation}: {message}")]
    StorageError { operation: String, message: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RegistryError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn storage(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::StorageError {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTokenFormat(_) => codes::authentication::INVALID_TOKEN_FORMAT,
            Self::Unauthorized(_) => codes::authentication::UNAUTHORIZED,
            Self::UpstreamUnavailable(_) => codes::authentication::UPSTREAM_UNAVAILABLE,
            Self::Forbidden(_) => codes::authorization::INSUFFICIENT_SCOPE,
            Self::ValidationError(_) => codes::validation::INVALID_INPUT,
            Self::PayloadTooLarge(_) => codes::validation::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => codes::storage::NOT_FOUND,
            Self::StorageError { .. } => codes::storage::OPERATION_FAILED,
            Self::ConfigError(_) => codes::system::CONFIGURATION,
            Self::Other(_) => codes::system::INTERNAL,
        }
    }

    /// Whether the caller, rather than the registry, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenFormat(_)
                | Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::ValidationError(_)
                | Self::PayloadTooLarge(_)
                | Self::NotFound(_)
        )
    }

    /// Message safe to hand back to clients.
    ///
    /// Internal failures collapse to a generic text so storage paths or
    /// upstream addresses do not leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::StorageError { operation, .. } => format!("storage operation {operation} failed"),
            Self::ConfigError(_) | Self::Other(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Log an error with its code at the boundary where it is turned into a response
pub fn log_error(context: &str, error: &RegistryError) {
    if error.is_client_error() {
        tracing::debug!(context = context, code = error.code(), error = %error, "request rejected");
    } else {
        tracing::error!(context = context, code = error.code(), error = %error, "registry error occurred");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_hides_details() {
        let err = RegistryError::storage("get package", "/var/data/pkg.tgz: permission denied");
        assert_eq!(err.public_message(), "storage operation get package failed");
        assert!(err.to_string().contains("permission denied"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_codes_are_distinct_per_category() {
        assert_eq!(RegistryError::unauthorized("x").code(), "AUTH_2002");
        assert_eq!(RegistryError::InvalidTokenFormat("x".into()).code(), "AUTH_2001");
        assert_eq!(RegistryError::validation("x").code(), "VALIDATION_1001");
        assert_eq!(RegistryError::Forbidden("x".into()).code(), "AUTHZ_3001");
        assert_eq!(RegistryError::PayloadTooLarge("x".into()).code(), "VALIDATION_1002");
    }

    #[test]
    fn test_client_errors() {
        assert!(RegistryError::NotFound("abc".into()).is_client_error());
        assert!(!RegistryError::UpstreamUnavailable("dial".into()).is_client_error());
        assert_eq!(
            RegistryError::validation("at least one package is required").public_message(),
            "validation error: at least one package is required"
        );
    }
}
