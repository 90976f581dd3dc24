use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::{log_error, RegistryError};
use package_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonic::{Code, Status};
use uuid::Uuid;

/// Error body of every JSON endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Stable error code, e.g. `AUTH_2002`
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Failure of an HTTP handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Status returned by the registry RPC service to the JSON gateway
    #[error("{}", .0.message())]
    Rpc(#[from] Status),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Registry(err.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Registry(err) => match err {
                RegistryError::InvalidTokenFormat(_) | RegistryError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                RegistryError::Forbidden(_) => StatusCode::FORBIDDEN,
                RegistryError::ValidationError(_) => StatusCode::BAD_REQUEST,
                RegistryError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                RegistryError::StorageError { .. } | RegistryError::ConfigError(_) | RegistryError::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Rpc(status) => http_status(status.code()),
        }
    }

    pub fn error_type(&self) -> String {
        match self {
            Self::Registry(err) => err.code().to_string(),
            Self::Rpc(status) => format!("{:?}", status.code()),
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Registry(err) => err.public_message(),
            Self::Rpc(status) => status.message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        match &self {
            Self::Registry(err) => log_error("http", err),
            Self::Rpc(status) => tracing::debug!(
                error_id = %error_id,
                code = ?status.code(),
                message = %status.message(),
                "Gateway call failed"
            ),
        }

        let body = ApiErrorResponse {
            error_id,
            error_type: self.error_type(),
            message: self.public_message(),
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

/// HTTP equivalent of an RPC status code
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// RPC status for a registry error. Only the public message crosses the wire.
pub fn status_from_error(err: RegistryError) -> Status {
    log_error("grpc", &err);
    let message = err.public_message();
    match err {
        RegistryError::InvalidTokenFormat(_) | RegistryError::Unauthorized(_) => Status::unauthenticated(message),
        RegistryError::Forbidden(_) => Status::permission_denied(message),
        RegistryError::ValidationError(_) => Status::invalid_argument(message),
        RegistryError::PayloadTooLarge(_) => Status::resource_exhausted(message),
        RegistryError::NotFound(_) => Status::not_found(message),
        RegistryError::UpstreamUnavailable(_) => Status::unavailable(message),
        RegistryError::StorageError { .. } | RegistryError::ConfigError(_) | RegistryError::Other(_) => {
            Status::internal(message)
        }
    }
}
