//! Authentication for the plugin registry
//!
//! Tokens are never validated locally. Every credential is handed to the
//! external identity service over one shared, lazily dialed connection:
//!
//! - [`Credential`]: bearer token from the `authorization` header or the
//!   session cookie
//! - [`IdentityConnectionManager`]: exactly-once dial of the identity service
//! - [`AuthorizationEnforcer`]: the single verification path used by every transport
//! - [`VerifiedIdentity`]: subject and scopes confirmed for one request
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use auth_gateway::{AuthorizationEnforcer, CredentialLookup, IdentityConnectionManager, TlsDialer};
//!
//! # async fn run(headers: http::HeaderMap, ca_pem: String) -> error_common::Result<()> {
//! let manager = Arc::new(IdentityConnectionManager::new(TlsDialer::new(
//!     "https://identity.hooklift.io:443",
//!     "lift-registry",
//!     ca_pem,
//! )));
//! manager.connection().await?;
//!
//! let enforcer = AuthorizationEnforcer::new(manager, "lift-registry", "hatk", Duration::from_secs(10));
//! if let Some(identity) = enforcer.authorize(&headers, CredentialLookup::HeaderThenCookie).await? {
//!     println!("verified {}", identity.subject);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod credential;
pub mod enforcer;
pub mod identity;

/// Generated client for the identity service
#[allow(clippy::all, clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("hooklift.identity.v1");
}

pub use connection::{Dialer, IdentityChannel, IdentityConnectionManager, TlsDialer, TokenVerifier};
pub use credential::{cookie_value, extract_credential, Credential, CredentialLookup, CredentialSource, BEARER_SCHEME};
pub use enforcer::AuthorizationEnforcer;
pub use identity::VerifiedIdentity;
