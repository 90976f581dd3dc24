use config_engine::LoggingConfig;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{Result, TelemetryError};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set. With `logging.json` the
/// output is one JSON object per event, otherwise human readable lines.
///
/// # Errors
/// Fails when the level directive does not parse or a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init()
    };

    installed.map_err(|e| TelemetryError::TracingError(e.to_string()))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!(
        "registry_server={level},auth_gateway={level},plugins_registry_api={level},package_storage={level},tower_http=info,hyper=info,h2=warn"
    ))
    .map_err(|e| TelemetryError::TracingError(format!("invalid log level {level:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_plain_levels() {
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("warn").is_ok());
    }
}
