//! Configuration management for the plugin registry
//!
//! Sources are layered with `figment`, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`RegistryConfig::default`])
//! 2. An optional TOML file
//! 3. Environment variables prefixed `REGISTRY_`, nested keys split on `__`
//!    (`REGISTRY_IDENTITY__CLIENT_ID` sets `identity.client_id`)
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::ConfigEngine;
//!
//! let config = ConfigEngine::load(None).expect("invalid configuration");
//! println!("listening on {}", config.listen_address());
//! ```

pub mod error;
pub mod settings;
pub mod validation;

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

pub use error::*;
pub use settings::*;
pub use validation::identity_host;

/// Environment variable prefix for every registry setting
pub const ENV_PREFIX: &str = "REGISTRY_";

pub struct ConfigEngine;

impl ConfigEngine {
    /// Load and validate the registry configuration.
    ///
    /// # Errors
    /// Fails when the given file does not exist, a source cannot be parsed,
    /// or the merged configuration does not validate.
    pub fn load(path: Option<&Path>) -> Result<RegistryConfig> {
        let mut figment = Figment::from(Serialized::defaults(RegistryConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::SourceNotFound(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration from an already assembled figment.
    ///
    /// # Errors
    /// Fails on parse or validation errors.
    pub fn from_figment(figment: &Figment) -> Result<RegistryConfig> {
        let config: RegistryConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
