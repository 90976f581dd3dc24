use std::sync::Arc;
use std::time::Duration;

use error_common::{RegistryError, Result};
use http::HeaderMap;

use crate::connection::TokenVerifier;
use crate::credential::{extract_credential, Credential, CredentialLookup};
use crate::identity::VerifiedIdentity;

/// Transport independent authorization.
///
/// The RPC security stage and the HTTP filter both call into this type, so
/// credential parsing and verification cannot drift apart between them.
#[derive(Clone)]
pub struct AuthorizationEnforcer {
    verifier: Arc<dyn TokenVerifier>,
    client_id: String,
    session_cookie: String,
    verify_timeout: Duration,
}

impl AuthorizationEnforcer {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        client_id: impl Into<String>,
        session_cookie: impl Into<String>,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            client_id: client_id.into(),
            session_cookie: session_cookie.into(),
            verify_timeout,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Credential of a request, if it carries one
    ///
    /// # Errors
    /// [`RegistryError::InvalidTokenFormat`] for a malformed `authorization` header.
    pub fn credential(&self, headers: &HeaderMap, lookup: CredentialLookup) -> Result<Option<Credential>> {
        extract_credential(headers, lookup, &self.session_cookie).inspect_err(|_| {
            telemetry::record_verification("malformed");
        })
    }

    /// Verify a credential with exactly one call to the identity service.
    ///
    /// The call is abandoned when it outlives the verify timeout or when the
    /// caller drops this future.
    ///
    /// # Errors
    /// [`RegistryError::Unauthorized`] when the token is rejected or the call
    /// fails, [`RegistryError::UpstreamUnavailable`] when no connection exists.
    pub async fn verify(&self, credential: &Credential) -> Result<VerifiedIdentity> {
        let call = self.verifier.verify_token(&self.client_id, credential.token());

        match tokio::time::timeout(self.verify_timeout, call).await {
            Ok(Ok(identity)) => {
                telemetry::record_verification("verified");
                tracing::debug!(subject = %identity.subject, "Token verified");
                Ok(identity)
            }
            Ok(Err(RegistryError::UpstreamUnavailable(message))) => {
                telemetry::record_verification("unavailable");
                Err(RegistryError::UpstreamUnavailable(message))
            }
            Ok(Err(e)) => {
                telemetry::record_verification("rejected");
                tracing::debug!(error = %e, "Token rejected");
                Err(RegistryError::unauthorized(match e {
                    RegistryError::Unauthorized(message) => message,
                    other => other.to_string(),
                }))
            }
            Err(_) => {
                telemetry::record_verification("rejected");
                tracing::warn!(timeout = ?self.verify_timeout, "Token verification timed out");
                Err(RegistryError::unauthorized("token verification timed out"))
            }
        }
    }

    /// Extract and verify in one step. `Ok(None)` means the request carried
    /// no credential at all, which is left for the handler to judge.
    ///
    /// # Errors
    /// Any error of [`Self::credential`] or [`Self::verify`].
    pub async fn authorize(&self, headers: &HeaderMap, lookup: CredentialLookup) -> Result<Option<VerifiedIdentity>> {
        match self.credential(headers, lookup)? {
            Some(credential) => self.verify(&credential).await.map(Some),
            None => Ok(None),
        }
    }
}
