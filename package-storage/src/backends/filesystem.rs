use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::storage::{ByteStream, StorageProvider};

/// Packages stored as plain files under one directory
pub struct FileSystemProvider {
    base_path: PathBuf,
}

impl FileSystemProvider {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Create the storage directory if missing
    ///
    /// # Errors
    /// Fails when the directory cannot be created.
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::io("create storage directory", e))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl StorageProvider for FileSystemProvider {
    async fn put_stream(&self, key: &str, mut body: ByteStream<'_>) -> Result<u64> {
        // Written next to the target and renamed, so readers never see a partial package
        let staging = self.base_path.join(format!(".{key}.{}.part", Uuid::new_v4()));
        let mut file = fs::File::create(&staging)
            .await
            .map_err(|e| StorageError::io("create package file", e))?;

        let mut written: u64 = 0;
        let copied: Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| StorageError::io("read upload", e))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| StorageError::io("write package file", e))?;
                written = written.saturating_add(chunk.len() as u64);
            }
            file.flush().await.map_err(|e| StorageError::io("flush package file", e))
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        fs::rename(&staging, self.object_path(key))
            .await
            .map_err(|e| StorageError::io("publish package file", e))?;
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream<'static>> {
        let file = fs::File::open(self.object_path(key)).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::io("open package file", e),
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
