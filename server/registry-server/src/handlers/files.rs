//! Package upload and download

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use auth_gateway::VerifiedIdentity;
use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use futures::StreamExt;
use package_storage::{package_key, upload, PartSource, StorageError, StorageProvider, UploadPart};
use plugins_registry_api::ScopePolicy;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::paths;

#[derive(Clone)]
pub struct FilesState {
    pub storage: Arc<dyn StorageProvider>,
    pub policy: ScopePolicy,
    /// Domain used to build download URLs
    pub primary_domain: String,
    /// Upload request size limit, none when unset
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

pub fn routes(state: FilesState) -> Router {
    // Parts are streamed into storage, so no limit is needed to bound memory
    let body_limit = match state.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route(paths::FILES, post(upload_packages).layer(body_limit))
        .route(paths::FILE_BY_KEY, get(download_package))
        .with_state(state)
}

fn multipart_error(err: &MultipartError) -> StorageError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StorageError::UploadTooLarge(err.body_text())
    } else {
        StorageError::InvalidUpload(err.body_text())
    }
}

/// Multipart failures inside a part body reach storage as I/O errors
fn upload_error(err: StorageError) -> StorageError {
    match err {
        StorageError::Io { operation, source } => {
            let multipart = source
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<MultipartError>())
                .map(multipart_error);
            multipart.unwrap_or(StorageError::Io { operation, source })
        }
        other => other,
    }
}

/// Multipart request body as a sequence of upload parts
struct MultipartSource(Multipart);

#[async_trait]
impl PartSource for MultipartSource {
    async fn next_part<'a>(&'a mut self) -> package_storage::Result<Option<UploadPart<'a>>> {
        let field = self
            .0
            .next_field()
            .await
            .map_err(|e| multipart_error(&e))?;

        Ok(field.map(|field| UploadPart {
            field_name: field.name().map(str::to_string),
            file_name: field.file_name().map(str::to_string),
            body: Box::pin(field.map(|chunk| chunk.map_err(io::Error::other))),
        }))
    }
}

async fn upload_packages(
    State(state): State<FilesState>,
    identity: Option<Extension<VerifiedIdentity>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let identity = identity.map(|Extension(identity)| identity);
    let identity = state.policy.authorize(identity.as_ref())?;

    let stored = upload(state.storage.as_ref(), &mut MultipartSource(multipart))
        .await
        .map_err(upload_error)?;
    if stored.is_empty() {
        return Err(StorageError::InvalidUpload("no file parts in request".to_string()).into());
    }

    tracing::info!(subject = %identity.subject, count = stored.len(), "Packages uploaded");

    let urls = stored
        .iter()
        .map(|object| format!("https://{}{}/{}", state.primary_domain, paths::FILES, object.key))
        .collect();
    Ok(Json(UploadResponse { urls }))
}

async fn download_package(State(state): State<FilesState>, Path(key): Path<String>) -> Result<Response, ApiError> {
    let key = package_key(&key)?;
    let body = state.storage.get(&key).await?;

    Ok(([(CONTENT_TYPE, "application/octet-stream")], Body::from_stream(body)).into_response())
}
