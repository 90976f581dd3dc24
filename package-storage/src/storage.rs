use std::collections::HashMap;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::sync::RwLock;

use crate::error::{Result, StorageError};

/// Chunked package contents
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'a>>;

/// Object storage holding plugin packages
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store `body` under `key`, replacing any previous object. Returns the
    /// number of bytes written.
    async fn put_stream(&self, key: &str, body: ByteStream<'_>) -> Result<u64>;

    /// Stream the object stored under `key`
    async fn get(&self, key: &str) -> Result<ByteStream<'static>>;

    fn name(&self) -> &'static str;
}

/// A package written by [`upload`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
}

/// One part of a multipart upload. Form fields carry no file name.
pub struct UploadPart<'a> {
    pub field_name: Option<String>,
    pub file_name: Option<String>,
    pub body: ByteStream<'a>,
}

/// Sequential access to the parts of an upload, each borrowed until the next call
#[async_trait]
pub trait PartSource: Send {
    async fn next_part<'a>(&'a mut self) -> Result<Option<UploadPart<'a>>>;
}

/// Store every file part of `source` as it arrives, skipping plain form fields.
///
/// # Errors
/// Stops at the first part that cannot be read or stored; parts stored
/// before that stay in place.
pub async fn upload<S>(provider: &dyn StorageProvider, source: &mut S) -> Result<Vec<StoredObject>>
where
    S: PartSource + ?Sized,
{
    let mut stored = Vec::new();

    while let Some(part) = source.next_part().await? {
        let Some(file_name) = part.file_name.as_deref() else {
            tracing::debug!(field = ?part.field_name, "Skipping form field without file");
            continue;
        };
        let key = package_key(file_name)?;

        let size = provider.put_stream(&key, part.body).await?;
        tracing::info!(key = %key, size, backend = provider.name(), "Package stored");
        stored.push(StoredObject { key, size });
    }

    Ok(stored)
}

/// Reduce a client supplied file name or path to a storage key: its final
/// path segment.
///
/// # Errors
/// [`StorageError::InvalidKey`] when nothing usable remains.
pub fn package_key(name: &str) -> Result<String> {
    let key = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if key.is_empty() || key.starts_with('.') {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(key.to_string())
}

/// Volatile provider, for tests and local development
#[derive(Default)]
pub struct MemoryProvider {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    async fn put_stream(&self, key: &str, mut body: ByteStream<'_>) -> Result<u64> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StorageError::io("read upload", e))?;
            buffer.extend_from_slice(&chunk);
        }
        let size = buffer.len() as u64;
        self.objects.write().await.insert(key.to_string(), buffer.freeze());
        Ok(size)
    }

    async fn get(&self, key: &str) -> Result<ByteStream<'static>> {
        let object = self
            .object(key)
            .await
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(Box::pin(futures::stream::once(async move { Ok(object) })))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
