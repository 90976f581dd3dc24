//! JSON gateway in front of the registry RPC service.
//!
//! Every route is answered by calling the RPC service in process through a
//! tonic client, so JSON calls pass through the same interceptor chain as
//! native gRPC calls.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{delete, get},
    Json, Router,
};
use auth_gateway::{cookie_value, Credential};
use serde::Deserialize;
use tonic::metadata::{Ascii, MetadataValue};
use tower::util::MapRequest;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::grpc::proto::registry_client::RegistryClient;
use crate::grpc::{proto, RegistryGrpcService};
use crate::interceptors::{GrpcRequest, InterceptedService};
use crate::routes::paths;

/// Intercepted RPC service seen as a client transport
pub type LocalChannel =
    MapRequest<InterceptedService<RegistryGrpcService>, fn(http::Request<tonic::body::BoxBody>) -> GrpcRequest>;

pub fn local_channel(service: InterceptedService<RegistryGrpcService>) -> LocalChannel {
    service.map_request(into_axum_request as fn(http::Request<tonic::body::BoxBody>) -> GrpcRequest)
}

fn into_axum_request(request: http::Request<tonic::body::BoxBody>) -> GrpcRequest {
    request.map(Body::new)
}

#[derive(Clone)]
pub struct GatewayState {
    client: RegistryClient<LocalChannel>,
    session_cookie: Arc<str>,
}

impl GatewayState {
    pub fn new(channel: LocalChannel, session_cookie: &str) -> Self {
        Self {
            client: RegistryClient::new(channel),
            session_cookie: Arc::from(session_cookie),
        }
    }

    /// RPC request carrying the caller's credential as `authorization` metadata
    fn request<T>(&self, headers: &HeaderMap, message: T) -> Result<tonic::Request<T>, ApiError> {
        let mut request = tonic::Request::new(message);

        let authorization = match headers.get(AUTHORIZATION) {
            Some(value) => Some(value.as_bytes().to_vec()),
            None => cookie_value(headers, &self.session_cookie)
                .and_then(Credential::from_cookie_value)
                .map(|credential| credential.to_bearer_value().into_bytes()),
        };

        if let Some(value) = authorization {
            let value = MetadataValue::<Ascii>::try_from(value.as_slice())
                .map_err(|_| tonic::Status::unauthenticated("authorization value is not valid metadata"))?;
            request.metadata_mut().insert("authorization", value);
        }
        Ok(request)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub query: String,
    pub page_number: u32,
    pub results_per_page: u32,
}

pub fn routes(state: GatewayState) -> Router {
    Router::new()
        .route(paths::PLUGINS, get(search).post(publish))
        .route(paths::PLUGIN_BY_ID, delete(unpublish))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn search(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<proto::SearchResponse>, ApiError> {
    let request = state.request(
        &headers,
        proto::SearchRequest {
            query: params.query,
            page_number: params.page_number,
            results_per_page: params.results_per_page,
        },
    )?;

    let response = state.client.clone().search(request).await?;
    Ok(Json(response.into_inner()))
}

async fn publish(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(plugin): Json<proto::PluginManifest>,
) -> Result<Json<proto::PublishResponse>, ApiError> {
    let request = state.request(&headers, proto::PublishRequest { plugin: Some(plugin) })?;

    let response = state.client.clone().publish(request).await?;
    Ok(Json(response.into_inner()))
}

async fn unpublish(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<proto::UnpublishResponse>, ApiError> {
    let request = state.request(&headers, proto::UnpublishRequest { id })?;

    let response = state.client.clone().unpublish(request).await?;
    Ok(Json(response.into_inner()))
}
