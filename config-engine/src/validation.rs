// Configuration validation, run once after every source has been merged
use http::Uri;

use crate::error::{ConfigError, Result};
use crate::settings::RegistryConfig;

impl RegistryConfig {
    /// Reject configurations the registry cannot start with.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.identity.client_id.trim().is_empty() {
            return Err(ConfigError::Validation("identity.client_id is required".to_string()));
        }

        identity_host(&self.identity.address)?;

        if !self.tls.is_configured() {
            return Err(ConfigError::Validation(
                "tls certificate and private key are required".to_string(),
            ));
        }

        if self.auth.privileged_scopes.is_empty() {
            return Err(ConfigError::Validation(
                "auth.privileged_scopes must name at least one scope".to_string(),
            ));
        }

        if !self.gateway.static_exception_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "gateway.static_exception_path must be an absolute path".to_string(),
            ));
        }

        Ok(())
    }
}

/// Host part of the identity service URL
///
/// # Errors
/// Fails on a malformed URL or one without a host.
pub fn identity_host(address: &str) -> Result<String> {
    let uri: Uri = address
        .parse()
        .map_err(|e| ConfigError::Validation(format!("invalid identity.address {address:?}: {e}")))?;
    uri.host()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Validation(format!("identity.address {address:?} has no host")))
}
