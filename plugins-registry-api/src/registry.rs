use std::sync::Arc;

use auth_gateway::VerifiedIdentity;
use chrono::Utc;
use error_common::{RegistryError, Result};
use uuid::Uuid;

use crate::model::Manifest;
use crate::pagination::PageRequest;
use crate::repository::ManifestRepository;

/// Scopes allowed to change the registry.
///
/// Holding any one of them is enough.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    privileged: Vec<String>,
}

impl ScopePolicy {
    pub fn any_of<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            privileged: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn privileged_scopes(&self) -> &[String] {
        &self.privileged
    }

    /// # Errors
    /// [`RegistryError::Unauthorized`] without an identity,
    /// [`RegistryError::Forbidden`] when none of the privileged scopes was granted.
    pub fn authorize<'a>(&self, identity: Option<&'a VerifiedIdentity>) -> Result<&'a VerifiedIdentity> {
        let identity = identity.ok_or_else(|| RegistryError::unauthorized("a verified identity is required"))?;
        if !identity.has_any_scope(&self.privileged) {
            return Err(RegistryError::Forbidden(format!(
                "one of the scopes [{}] is required",
                self.privileged.join(", ")
            )));
        }
        Ok(identity)
    }
}

/// Publishing rules in front of a [`ManifestRepository`]
#[derive(Clone)]
pub struct ManifestRegistry {
    repository: Arc<dyn ManifestRepository>,
    policy: ScopePolicy,
}

impl ManifestRegistry {
    pub fn new(repository: Arc<dyn ManifestRepository>, policy: ScopePolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Public search, no identity needed
    ///
    /// # Errors
    /// Repository failures.
    pub async fn search(&self, query: &str, page: PageRequest) -> Result<Vec<Manifest>> {
        self.repository
            .search(query, page.page_number, page.page_size())
            .await
    }

    /// Validate, stamp and store a manifest. Returns the stored document.
    ///
    /// # Errors
    /// Authorization failures of [`ScopePolicy::authorize`],
    /// [`RegistryError::ValidationError`] for an invalid manifest, or
    /// repository failures.
    pub async fn publish(&self, identity: Option<&VerifiedIdentity>, mut manifest: Manifest) -> Result<Manifest> {
        let identity = self.policy.authorize(identity)?;

        validate(&manifest)?;
        manifest.version = normalize_version(&manifest.version)?;
        manifest.name = manifest.name.trim().to_string();
        manifest.id = Uuid::new_v4().to_string();
        manifest.account_id.clone_from(&identity.subject);
        manifest.published_at = Some(Utc::now());

        self.repository.save(manifest.clone()).await?;

        tracing::info!(
            plugin_id = %manifest.id,
            name = %manifest.name,
            version = %manifest.version,
            subject = %identity.subject,
            "Plugin published"
        );
        Ok(manifest)
    }

    /// Remove a manifest owned by the caller
    ///
    /// # Errors
    /// Authorization failures, [`RegistryError::ValidationError`] for an empty
    /// id, or whatever the repository reports (`NotFound`, ownership mismatch).
    pub async fn unpublish(&self, identity: Option<&VerifiedIdentity>, id: &str) -> Result<()> {
        let identity = self.policy.authorize(identity)?;

        let id = id.trim();
        if id.is_empty() {
            return Err(RegistryError::validation("plugin id is required"));
        }

        self.repository.delete(id, &identity.subject).await?;
        tracing::info!(plugin_id = %id, subject = %identity.subject, "Plugin unpublished");
        Ok(())
    }
}

fn validate(manifest: &Manifest) -> Result<()> {
    if manifest.name.trim().is_empty() {
        return Err(RegistryError::validation("plugin name is required"));
    }
    if manifest.packages.is_empty() {
        return Err(RegistryError::validation("at least one package is required"));
    }
    if let Some(package) = manifest.packages.iter().find(|p| p.checksum.trim().is_empty()) {
        return Err(RegistryError::validation(format!(
            "package {:?} for {}/{} has no checksum",
            package.name, package.os, package.arch
        )));
    }
    Ok(())
}

/// Parse and re-serialize a semantic version
///
/// # Errors
/// [`RegistryError::ValidationError`] when the string is not a semantic version.
pub fn normalize_version(version: &str) -> Result<String> {
    semver::Version::parse(version.trim())
        .map(|v| v.to_string())
        .map_err(|e| RegistryError::validation(format!("invalid version {version:?}: {e}")))
}
