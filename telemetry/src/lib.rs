//! Observability for the plugin registry
//!
//! - Structured logging through `tracing`, human readable or JSON
//! - Counters and histograms through the `metrics` facade, optionally
//!   exported for Prometheus scraping
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::LoggingConfig;
//!
//! telemetry::init_tracing(&LoggingConfig::default()).expect("tracing already installed");
//! telemetry::record_http_request("GET", 200);
//! ```

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::*;
pub use logging::init_tracing;
pub use self::metrics::{install_prometheus, record_grpc_call, record_http_request, record_verification};
