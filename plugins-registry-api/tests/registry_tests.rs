use std::sync::Arc;

use auth_gateway::VerifiedIdentity;
use chrono::Utc;
use error_common::RegistryError;
use plugins_registry_api::{
    Algorithm, Arch, Author, InMemoryRepository, Manifest, ManifestRegistry, Os, Package, PageRequest, ScopePolicy,
};

fn registry() -> (ManifestRegistry, Arc<InMemoryRepository>) {
    let repository = Arc::new(InMemoryRepository::new());
    let registry = ManifestRegistry::new(repository.clone(), ScopePolicy::any_of(["admin", "write", "global"]));
    (registry, repository)
}

fn publisher(subject: &str) -> VerifiedIdentity {
    VerifiedIdentity::new(subject, vec!["write".to_string()])
}

fn draft(name: &str, version: &str) -> Manifest {
    Manifest {
        id: "client-chosen".to_string(),
        account_id: "someone-else".to_string(),
        name: name.to_string(),
        version: version.to_string(),
        description: "Postgres storage driver".to_string(),
        author: Author {
            name: "Hooklift".to_string(),
            email: "dev@hooklift.io".to_string(),
        },
        license: "MPL-2.0".to_string(),
        homepage: "https://hooklift.io".to_string(),
        packages: vec![Package {
            name: format!("{name}-linux-x64.tgz"),
            arch: Arch::X64,
            os: Os::Linux,
            url: format!("https://registry.hooklift.io/files/{name}-linux-x64.tgz"),
            checksum: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
            algorithm: Algorithm::Sha256,
        }],
        published_at: None,
    }
}

#[tokio::test]
async fn test_publish_assigns_identity_fields() {
    let (registry, repository) = registry();
    let started = Utc::now();

    let stored = registry
        .publish(Some(&publisher("acct-a")), draft("postgres", " 1.4.0 "))
        .await
        .unwrap();

    assert!(!stored.id.is_empty());
    assert_ne!(stored.id, "client-chosen");
    assert_eq!(stored.account_id, "acct-a");
    assert_eq!(stored.version, "1.4.0");
    assert!(stored.published_at.unwrap() >= started);
    assert_eq!(repository.get(&stored.id).await.unwrap(), stored);
}

#[tokio::test]
async fn test_publish_rejects_invalid_manifests() {
    let (registry, repository) = registry();
    let identity = publisher("acct-a");

    let mut no_packages = draft("postgres", "1.0.0");
    no_packages.packages.clear();
    let err = registry.publish(Some(&identity), no_packages).await.unwrap_err();
    assert!(matches!(err, RegistryError::ValidationError(_)));

    let err = registry
        .publish(Some(&identity), draft("postgres", "one point oh"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ValidationError(_)));

    let mut no_checksum = draft("postgres", "1.0.0");
    no_checksum.packages[0].checksum = String::new();
    let err = registry.publish(Some(&identity), no_checksum).await.unwrap_err();
    assert!(matches!(err, RegistryError::ValidationError(_)));

    assert!(repository.is_empty().await);
}

#[tokio::test]
async fn test_publish_requires_privileged_identity() {
    let (registry, repository) = registry();

    let err = registry.publish(None, draft("postgres", "1.0.0")).await.unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized(_)));

    let reader = VerifiedIdentity::new("acct-a", vec!["read".to_string()]);
    let err = registry
        .publish(Some(&reader), draft("postgres", "1.0.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Forbidden(_)));

    let admin = VerifiedIdentity::new("acct-a", vec!["admin".to_string()]);
    registry.publish(Some(&admin), draft("postgres", "1.0.0")).await.unwrap();
    assert_eq!(repository.len().await, 1);
}

#[tokio::test]
async fn test_unpublish_only_by_owner() {
    let (registry, repository) = registry();
    let stored = registry
        .publish(Some(&publisher("acct-a")), draft("postgres", "1.0.0"))
        .await
        .unwrap();

    let err = registry
        .unpublish(Some(&publisher("acct-b")), &stored.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized(_)));
    assert!(repository.get(&stored.id).await.is_some());

    registry.unpublish(Some(&publisher("acct-a")), &stored.id).await.unwrap();
    assert!(repository.get(&stored.id).await.is_none());

    let err = registry
        .unpublish(Some(&publisher("acct-a")), &stored.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));

    let err = registry.unpublish(Some(&publisher("acct-a")), "  ").await.unwrap_err();
    assert!(matches!(err, RegistryError::ValidationError(_)));
}

#[tokio::test]
async fn test_search_page_size_is_capped() {
    let (registry, _) = registry();
    let identity = publisher("acct-a");
    for i in 0..60 {
        registry
            .publish(Some(&identity), draft(&format!("plugin-{i:02}"), "1.0.0"))
            .await
            .unwrap();
    }

    assert_eq!(registry.search("", PageRequest::new(0, 0)).await.unwrap().len(), 10);
    assert_eq!(registry.search("", PageRequest::new(0, 1000)).await.unwrap().len(), 50);
    assert_eq!(registry.search("", PageRequest::new(1, 1000)).await.unwrap().len(), 10);
    assert!(registry.search("", PageRequest::new(2, 1000)).await.unwrap().is_empty());

    let second_page = registry.search("", PageRequest::new(1, 0)).await.unwrap();
    assert_eq!(second_page[0].name, "plugin-10");
}

#[test]
fn test_manifest_json_uses_wire_names() {
    let json = serde_json::to_value(draft("postgres", "1.0.0")).unwrap();
    assert_eq!(json["packages"][0]["os"], "linux");
    assert_eq!(json["packages"][0]["algorithm"], "sha256");

    let mac: Os = serde_json::from_str("\"macOS\"").unwrap();
    assert_eq!(mac, Os::MacOs);
}
