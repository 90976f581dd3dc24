use std::sync::Arc;
use std::time::Duration;

use auth_gateway::{AuthorizationEnforcer, IdentityConnectionManager, TlsDialer};
use axum::{middleware::from_fn, middleware::from_fn_with_state, Router};
use config_engine::{RegistryConfig, StorageBackendKind};
use error_common::Result;
use package_storage::{FileSystemProvider, StorageProvider};
use plugins_registry_api::{InMemoryRepository, ManifestRegistry, ScopePolicy};
use tower::util::BoxCloneService;
use tower_http::trace::TraceLayer;

use crate::dispatcher::ProtocolDispatcher;
use crate::gateway::{self, GatewayState};
use crate::grpc::{grpc_service, STREAMING_METHODS};
use crate::handlers::files::{self, FilesState};
use crate::handlers::webapp;
use crate::interceptors::{ChainBuilder, MetricsStage, SecurityStage};
use crate::middleware::{identity_filter, request_logging_middleware};

/// Shared state of the registry process
#[derive(Clone)]
pub struct RegistryState {
    pub config: Arc<RegistryConfig>,
    /// Single authorization path of the RPC chain and the HTTP filter
    pub enforcer: AuthorizationEnforcer,
    pub registry: ManifestRegistry,
    pub storage: Arc<dyn StorageProvider>,
}

impl RegistryState {
    /// Connect to the identity service and build the registry around it.
    ///
    /// # Errors
    /// Fails when the identity service cannot be reached or the storage
    /// backend cannot be set up. Both stop the process.
    pub async fn connect(config: RegistryConfig) -> Result<Self> {
        let ca_pem = config.identity_ca_pem()?;
        let manager = Arc::new(IdentityConnectionManager::new(TlsDialer::new(
            config.identity.address.clone(),
            config.identity.client_id.clone(),
            ca_pem,
        )));
        // Dial now so a bad address or certificate stops startup
        manager.connection().await?;

        let enforcer = AuthorizationEnforcer::new(
            manager,
            config.identity.client_id.clone(),
            config.auth.session_cookie.clone(),
            Duration::from_secs(config.identity.verify_timeout_secs),
        );
        let storage = storage_from_config(&config).await?;

        Ok(Self::new(config, enforcer, storage))
    }

    /// State around an already built enforcer and storage, with an empty
    /// in-memory manifest repository
    pub fn new(config: RegistryConfig, enforcer: AuthorizationEnforcer, storage: Arc<dyn StorageProvider>) -> Self {
        let registry = ManifestRegistry::new(
            Arc::new(InMemoryRepository::new()),
            ScopePolicy::any_of(config.auth.privileged_scopes.iter().cloned()),
        );
        Self {
            config: Arc::new(config),
            enforcer,
            registry,
            storage,
        }
    }
}

/// Storage backend selected by the configuration
///
/// # Errors
/// Fails when the backend cannot be initialized or was not compiled in.
pub async fn storage_from_config(config: &RegistryConfig) -> Result<Arc<dyn StorageProvider>> {
    match config.storage.backend {
        StorageBackendKind::Filesystem => {
            let provider = FileSystemProvider::new(&config.storage.root);
            provider.initialize().await?;
            tracing::info!(root = %config.storage.root.display(), "Using filesystem package storage");
            Ok(Arc::new(provider))
        }
        #[cfg(feature = "s3-backend")]
        StorageBackendKind::S3 => {
            let provider =
                package_storage::S3Provider::from_config(config.storage.s3_bucket.clone(), &config.storage.s3_region)
                    .await;
            tracing::info!(bucket = %config.storage.s3_bucket, "Using S3 package storage");
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "s3-backend"))]
        StorageBackendKind::S3 => Err(error_common::RegistryError::ConfigError(
            "storage.backend = \"s3\" needs the s3-backend feature".to_string(),
        )),
    }
}

/// The complete service stack answering every connection of the listener
pub fn build_service(state: &RegistryState) -> ProtocolDispatcher {
    let rpc = ChainBuilder::new()
        .unary(Arc::new(SecurityStage::new(state.enforcer.clone())))
        .unary(Arc::new(MetricsStage))
        .streaming(Arc::new(SecurityStage::new(state.enforcer.clone())))
        .streaming(Arc::new(MetricsStage))
        .build(grpc_service(state.registry.clone()), STREAMING_METHODS);

    let gateway = gateway::routes(GatewayState::new(
        gateway::local_channel(rpc.clone()),
        &state.config.auth.session_cookie,
    ))
    .layer(from_fn(request_logging_middleware));

    let fallback = Router::new()
        .merge(files::routes(FilesState {
            storage: Arc::clone(&state.storage),
            policy: state.registry.policy().clone(),
            primary_domain: state.config.primary_domain(),
            max_upload_bytes: state.config.storage.max_upload_bytes,
        }))
        .fallback_service(webapp::spa_service(&state.config.web.static_dir))
        .layer(from_fn_with_state(state.enforcer.clone(), identity_filter))
        .layer(from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http());

    ProtocolDispatcher::new(
        BoxCloneService::new(rpc),
        BoxCloneService::new(gateway),
        BoxCloneService::new(fallback),
        state.config.gateway.static_exception_path.clone(),
    )
}
