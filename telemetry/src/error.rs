use error_common::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingError(String),

    #[error("Metrics exporter failed: {0}")]
    ExporterError(String),
}

impl From<TelemetryError> for RegistryError {
    fn from(err: TelemetryError) -> Self {
        RegistryError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
