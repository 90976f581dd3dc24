//! Registry metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported until [`install_prometheus`] runs; before that every
//! recording call is a no-op, so tests and embedders never need a recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{Result, TelemetryError};

pub const GRPC_CALLS_TOTAL: &str = "registry_grpc_calls_total";
pub const GRPC_CALL_DURATION_SECONDS: &str = "registry_grpc_call_duration_seconds";
pub const HTTP_REQUESTS_TOTAL: &str = "registry_http_requests_total";
pub const IDENTITY_VERIFICATIONS_TOTAL: &str = "registry_identity_verifications_total";

/// Start the Prometheus scrape endpoint. Must be called inside a tokio runtime.
///
/// # Errors
/// Fails when the listener cannot be set up or a recorder is already installed.
pub fn install_prometheus(listen_address: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen_address)
        .install()
        .map_err(|e| TelemetryError::ExporterError(e.to_string()))?;

    ::metrics::describe_counter!(GRPC_CALLS_TOTAL, "RPC calls handled, by method, call shape and status code");
    ::metrics::describe_histogram!(GRPC_CALL_DURATION_SECONDS, "RPC handler latency in seconds");
    ::metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests handled outside the RPC server");
    ::metrics::describe_counter!(IDENTITY_VERIFICATIONS_TOTAL, "Token verifications by outcome");

    tracing::info!(address = %listen_address, "Prometheus exporter listening");
    Ok(())
}

pub fn record_grpc_call(method: &str, shape: &'static str, code: &str, elapsed: Duration) {
    ::metrics::counter!(
        GRPC_CALLS_TOTAL,
        "method" => method.to_string(),
        "shape" => shape,
        "code" => code.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        GRPC_CALL_DURATION_SECONDS,
        "method" => method.to_string(),
        "shape" => shape
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_http_request(method: &str, status: u16) {
    ::metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// `outcome` is one of `verified`, `rejected`, `malformed` or `unavailable`
pub fn record_verification(outcome: &'static str) {
    ::metrics::counter!(IDENTITY_VERIFICATIONS_TOTAL, "outcome" => outcome).increment(1);
}
