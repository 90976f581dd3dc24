use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use error_common::{RegistryError, Result};
use tokio::sync::RwLock;

use crate::model::Manifest;
use crate::pagination::PageRequest;

/// Persistence and search of manifests.
///
/// Implementations receive already normalized page sizes and must enforce
/// ownership on delete themselves.
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn search(&self, query: &str, page_number: u32, page_size: u32) -> Result<Vec<Manifest>>;

    async fn save(&self, manifest: Manifest) -> Result<()>;

    /// Remove `id` only when it is owned by `account_id`
    async fn delete(&self, id: &str, account_id: &str) -> Result<()>;
}

/// Process-local repository, used when no search engine is configured
#[derive(Default)]
pub struct InMemoryRepository {
    manifests: RwLock<HashMap<String, Manifest>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.manifests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.manifests.read().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<Manifest> {
        self.manifests.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ManifestRepository for InMemoryRepository {
    async fn search(&self, query: &str, page_number: u32, page_size: u32) -> Result<Vec<Manifest>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let page = PageRequest::new(page_number, page_size);

        let manifests = self.manifests.read().await;
        let mut hits: Vec<&Manifest> = manifests.values().filter(|m| m.matches_terms(&terms)).collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| compare_versions(&a.version, &b.version)));

        Ok(hits
            .into_iter()
            .skip(page.offset())
            .take(page.page_size() as usize)
            .cloned()
            .collect())
    }

    async fn save(&self, manifest: Manifest) -> Result<()> {
        if manifest.id.is_empty() {
            return Err(RegistryError::validation("manifest id is required"));
        }
        self.manifests.write().await.insert(manifest.id.clone(), manifest);
        Ok(())
    }

    async fn delete(&self, id: &str, account_id: &str) -> Result<()> {
        let mut manifests = self.manifests.write().await;
        match manifests.get(id) {
            None => Err(RegistryError::NotFound(format!("plugin {id}"))),
            Some(stored) if stored.account_id != account_id => {
                tracing::warn!(plugin_id = %id, account_id = %account_id, "Refusing to delete plugin owned by another account");
                Err(RegistryError::unauthorized("plugin is owned by another account"))
            }
            Some(_) => {
                manifests.remove(id);
                Ok(())
            }
        }
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
