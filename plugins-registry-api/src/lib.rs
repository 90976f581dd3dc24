//! Plugin registry domain
//!
//! - [`Manifest`]: metadata of one published plugin version and its packages
//! - [`ManifestRepository`]: swappable persistence and search, with an
//!   [`InMemoryRepository`] for single-node deployments and tests
//! - [`ManifestRegistry`]: publish, unpublish and search rules, including the
//!   scope check against the caller's [`VerifiedIdentity`](auth_gateway::VerifiedIdentity)
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use plugins_registry_api::{InMemoryRepository, ManifestRegistry, PageRequest, ScopePolicy};
//!
//! # async fn run() -> error_common::Result<()> {
//! let registry = ManifestRegistry::new(
//!     Arc::new(InMemoryRepository::new()),
//!     ScopePolicy::any_of(["admin", "write", "global"]),
//! );
//! let first_page = registry.search("postgres", PageRequest::new(0, 0)).await?;
//! assert!(first_page.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod pagination;
pub mod registry;
pub mod repository;

pub use model::*;
pub use pagination::{PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use registry::{normalize_version, ManifestRegistry, ScopePolicy};
pub use repository::{InMemoryRepository, ManifestRepository};
