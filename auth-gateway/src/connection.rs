//! The single long-lived connection to the identity service.
//!
//! [`IdentityConnectionManager`] dials lazily and at most once, no matter how
//! many requests race for the first connection. The outcome of that dial,
//! success or failure, is kept for the lifetime of the process.

use std::time::Duration;

use async_trait::async_trait;
use error_common::{RegistryError, Result};
use tokio::sync::OnceCell;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use crate::identity::VerifiedIdentity;
use crate::proto::accounts_client::AccountsClient;
use crate::proto::VerifyTokenRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a connection to the identity service
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    async fn dial(&self) -> Result<Self::Connection>;
}

/// Anything able to answer `VerifyToken`
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, client_id: &str, token: &str) -> Result<VerifiedIdentity>;
}

pub struct IdentityConnectionManager<D: Dialer> {
    dialer: D,
    connection: OnceCell<std::result::Result<D::Connection, String>>,
}

impl<D: Dialer> IdentityConnectionManager<D> {
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            connection: OnceCell::new(),
        }
    }

    /// Shared connection handle, dialing on first use.
    ///
    /// Concurrent first callers wait for the one dial in flight and then
    /// observe its result.
    ///
    /// # Errors
    /// [`RegistryError::UpstreamUnavailable`] when the dial failed, now or earlier.
    pub async fn connection(&self) -> Result<D::Connection> {
        let outcome = self
            .connection
            .get_or_init(|| async {
                tracing::info!("Connecting to identity service");
                match self.dialer.dial().await {
                    Ok(connection) => {
                        tracing::info!("Identity service connection established");
                        Ok(connection)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Identity service connection failed");
                        Err(e.to_string())
                    }
                }
            })
            .await;

        outcome.clone().map_err(RegistryError::UpstreamUnavailable)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection.get(), Some(Ok(_)))
    }
}

#[async_trait]
impl<D> TokenVerifier for IdentityConnectionManager<D>
where
    D: Dialer,
    D::Connection: TokenVerifier,
{
    async fn verify_token(&self, client_id: &str, token: &str) -> Result<VerifiedIdentity> {
        let connection = self.connection().await?;
        connection.verify_token(client_id, token).await
    }
}

/// gRPC channel to the identity service
#[derive(Debug, Clone)]
pub struct IdentityChannel {
    client: AccountsClient<Channel>,
}

impl IdentityChannel {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: AccountsClient::new(channel),
        }
    }
}

#[async_trait]
impl TokenVerifier for IdentityChannel {
    async fn verify_token(&self, client_id: &str, token: &str) -> Result<VerifiedIdentity> {
        let mut client = self.client.clone();
        let response = client
            .verify_token(VerifyTokenRequest {
                client_id: client_id.to_string(),
                token: token.to_string(),
            })
            .await
            .map_err(|status| {
                RegistryError::unauthorized(format!("token verification failed: {}", status.message()))
            })?;

        let token = response
            .into_inner()
            .token
            .ok_or_else(|| RegistryError::unauthorized("identity service returned no token"))?;

        Ok(VerifiedIdentity::new(token.subject, token.scopes))
    }
}

/// Dials the identity service over TLS, trusting a single CA certificate
pub struct TlsDialer {
    address: String,
    client_id: String,
    ca_pem: String,
}

impl TlsDialer {
    pub fn new(address: impl Into<String>, client_id: impl Into<String>, ca_pem: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            client_id: client_id.into(),
            ca_pem: ca_pem.into(),
        }
    }

    fn endpoint(&self) -> Result<Endpoint> {
        let host = config_engine::identity_host(&self.address)
            .map_err(|e| RegistryError::UpstreamUnavailable(e.to_string()))?;
        ensure_certificates(&self.ca_pem)?;

        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(self.ca_pem.as_bytes()))
            .domain_name(host);

        Endpoint::from_shared(self.address.clone())
            .map_err(|e| unavailable("invalid identity address", e))?
            .tls_config(tls)
            .map_err(|e| unavailable("invalid TLS configuration", e))?
            .user_agent(self.client_id.clone())
            .map_err(|e| unavailable("invalid client id", e))
            .map(|endpoint| endpoint.connect_timeout(CONNECT_TIMEOUT))
    }
}

#[async_trait]
impl Dialer for TlsDialer {
    type Connection = IdentityChannel;

    async fn dial(&self) -> Result<IdentityChannel> {
        let endpoint = self.endpoint()?;
        tracing::debug!(address = %self.address, "Dialing identity service");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| unavailable("dial failed", e))?;
        Ok(IdentityChannel::new(channel))
    }
}

/// Reject trust material without a single parseable certificate
fn ensure_certificates(pem: &str) -> Result<()> {
    let mut reader = pem.as_bytes();
    let certificates = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| unavailable("unreadable CA certificate", e))?;
    if certificates.is_empty() {
        return Err(RegistryError::UpstreamUnavailable(
            "no certificate found in identity CA".to_string(),
        ));
    }
    Ok(())
}

fn unavailable(context: &str, error: impl std::fmt::Display) -> RegistryError {
    RegistryError::UpstreamUnavailable(format!("{context}: {error}"))
}
