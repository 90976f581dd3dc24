//! Middleware of the HTTP fallback surface

pub mod identity_filter;

use std::time::{Duration, Instant};

use axum::{extract::Request, middleware::Next, response::Response};

pub use identity_filter::identity_filter;

/// Requests slower than this are logged as warnings
const SLOW_REQUEST: Duration = Duration::from_secs(1);

/// Log every request once it has been answered
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let latency = started.elapsed();
    let status = response.status().as_u16();
    telemetry::record_http_request(method.as_str(), status);

    if latency > SLOW_REQUEST {
        tracing::warn!(method = %method, path = %path, status, latency_ms = latency.as_millis(), "Slow request");
    } else {
        tracing::info!(method = %method, path = %path, status, latency_ms = latency.as_millis(), "Request completed");
    }

    response
}
