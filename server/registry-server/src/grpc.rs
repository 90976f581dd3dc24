//! Registry RPC service

use auth_gateway::VerifiedIdentity;
use axum::body::Body;
use error_common::RegistryError;
use plugins_registry_api::{Author, Manifest, ManifestRegistry, Package, PageRequest};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tower::util::MapResponse;
use tower::ServiceExt;

use crate::error::status_from_error;
use crate::interceptors::{GrpcRequest, GrpcResponse};

// Include the generated gRPC code
#[allow(clippy::all, clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("lift.registry.v1");
}

use proto::registry_server::{Registry, RegistryServer};

/// Methods answered with a stream, routed through the streaming chain
pub const STREAMING_METHODS: &[&str] = &["/lift.registry.v1.Registry/StreamSearch"];

/// Manifests buffered between the search task and a slow stream consumer
const STREAM_BUFFER: usize = 16;

/// The generated server with responses converted to axum bodies
pub type RegistryGrpcService =
    MapResponse<RegistryServer<RegistryService>, fn(http::Response<tonic::body::BoxBody>) -> GrpcResponse>;

pub fn grpc_service(registry: ManifestRegistry) -> RegistryGrpcService {
    // The generated server accepts any body type; pin it to the one the chain carries
    ServiceExt::<GrpcRequest>::map_response(
        RegistryServer::new(RegistryService::new(registry)),
        into_axum_response as fn(http::Response<tonic::body::BoxBody>) -> GrpcResponse,
    )
}

fn into_axum_response(response: http::Response<tonic::body::BoxBody>) -> GrpcResponse {
    response.map(Body::new)
}

#[derive(Clone)]
pub struct RegistryService {
    registry: ManifestRegistry,
}

impl RegistryService {
    pub fn new(registry: ManifestRegistry) -> Self {
        Self { registry }
    }
}

fn identity<T>(request: &Request<T>) -> Option<VerifiedIdentity> {
    request.extensions().get::<VerifiedIdentity>().cloned()
}

#[tonic::async_trait]
impl Registry for RegistryService {
    async fn search(&self, request: Request<proto::SearchRequest>) -> Result<Response<proto::SearchResponse>, Status> {
        let req = request.into_inner();
        let page = PageRequest::new(req.page_number, req.results_per_page);

        let plugins = self
            .registry
            .search(&req.query, page)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(proto::SearchResponse {
            plugins: plugins.into_iter().map(Into::into).collect(),
        }))
    }

    type StreamSearchStream = ReceiverStream<Result<proto::PluginManifest, Status>>;

    async fn stream_search(
        &self,
        request: Request<proto::SearchRequest>,
    ) -> Result<Response<Self::StreamSearchStream>, Status> {
        let req = request.into_inner();
        let registry = self.registry.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let mut page = PageRequest::new(req.page_number, req.results_per_page);
            loop {
                let plugins = match registry.search(&req.query, page).await {
                    Ok(plugins) => plugins,
                    Err(e) => {
                        let _ = tx.send(Err(status_from_error(e))).await;
                        return;
                    }
                };

                let last_page = plugins.len() < page.page_size() as usize;
                for plugin in plugins {
                    if tx.send(Ok(plugin.into())).await.is_err() {
                        tracing::debug!(query = %req.query, "Search stream closed by client");
                        return;
                    }
                }
                if last_page {
                    return;
                }
                page = page.next();
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn publish(&self, request: Request<proto::PublishRequest>) -> Result<Response<proto::PublishResponse>, Status> {
        let identity = identity(&request);
        // Authorization is judged before the payload is
        self.registry
            .policy()
            .authorize(identity.as_ref())
            .map_err(status_from_error)?;

        let plugin = request
            .into_inner()
            .plugin
            .ok_or_else(|| Status::invalid_argument("plugin manifest is required"))?;
        let manifest = Manifest::try_from(plugin).map_err(status_from_error)?;

        let stored = self
            .registry
            .publish(identity.as_ref(), manifest)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(proto::PublishResponse {
            id: stored.id,
            version: stored.version,
            published_at: stored.published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }))
    }

    async fn unpublish(
        &self,
        request: Request<proto::UnpublishRequest>,
    ) -> Result<Response<proto::UnpublishResponse>, Status> {
        let identity = identity(&request);
        let req = request.into_inner();

        self.registry
            .unpublish(identity.as_ref(), &req.id)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(proto::UnpublishResponse {}))
    }
}

impl TryFrom<proto::PluginManifest> for Manifest {
    type Error = RegistryError;

    fn try_from(plugin: proto::PluginManifest) -> Result<Self, Self::Error> {
        let packages = plugin
            .packages
            .into_iter()
            .map(|p| {
                Ok(Package {
                    arch: p.arch.parse()?,
                    os: p.os.parse()?,
                    algorithm: p.algorithm.parse()?,
                    name: p.name,
                    url: p.url,
                    checksum: p.checksum,
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        let author = plugin.author.unwrap_or_default();

        Ok(Manifest {
            id: plugin.id,
            account_id: plugin.account_id,
            name: plugin.name,
            version: plugin.version,
            description: plugin.description,
            author: Author {
                name: author.name,
                email: author.email,
            },
            license: plugin.license,
            homepage: plugin.homepage,
            packages,
            published_at: None,
        })
    }
}

impl From<Manifest> for proto::PluginManifest {
    fn from(manifest: Manifest) -> Self {
        Self {
            id: manifest.id,
            account_id: manifest.account_id,
            name: manifest.name,
            version: manifest.version,
            description: manifest.description,
            author: Some(proto::Author {
                name: manifest.author.name,
                email: manifest.author.email,
            }),
            license: manifest.license,
            homepage: manifest.homepage,
            packages: manifest
                .packages
                .into_iter()
                .map(|p| proto::Package {
                    name: p.name,
                    arch: p.arch.to_string(),
                    os: p.os.to_string(),
                    url: p.url,
                    checksum: p.checksum,
                    algorithm: p.algorithm.to_string(),
                })
                .collect(),
            published_at: manifest.published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }
    }
}
