//! Common error handling for the plugin registry
//!
//! Every crate of the workspace reports failures through [`RegistryError`],
//! so that the gRPC and HTTP boundaries can map them to protocol status
//! codes in one place.
//!
//! # Error Categories
//!
//! - **InvalidTokenFormat / Unauthorized**: credential problems
//! - **Forbidden**: a verified identity without the required scope
//! - **UpstreamUnavailable**: the identity service connection is down
//! - **ValidationError**: malformed manifests and requests
//! - **NotFound / StorageError**: repository and object-storage failures
//!
//! # Example
//!
//! ```rust
//! use error_common::{RegistryError, Result};
//!
//! fn require_packages(count: usize) -> Result<()> {
//!     if count == 0 {
//!         return Err(RegistryError::validation("at least one package is required"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_packages(0).is_err());
//! ```

pub mod codes;
pub mod types;

pub use types::*;
