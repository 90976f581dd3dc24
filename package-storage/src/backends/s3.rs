use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::error::{Result, StorageError};
use crate::storage::{ByteStream, StorageProvider};

/// S3 requires every part but the last to be at least 5MB
const PART_SIZE: usize = 5 * 1024 * 1024;

/// Packages stored in an S3 bucket
pub struct S3Provider {
    client: S3Client,
    bucket: String,
}

impl S3Provider {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the environment's AWS credentials
    pub async fn from_config(bucket: impl Into<String>, region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::new(S3Client::new(&config), bucket)
    }

    async fn upload_parts(&self, key: &str, upload_id: &str, body: &mut ByteStream<'_>) -> Result<(Vec<CompletedPart>, u64)> {
        let mut parts = Vec::new();
        let mut buffer = BytesMut::with_capacity(PART_SIZE);
        let mut written: u64 = 0;
        let mut finished = false;

        while !finished {
            match body.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| StorageError::io("read upload", e))?;
                    written = written.saturating_add(chunk.len() as u64);
                    buffer.extend_from_slice(&chunk);
                    if buffer.len() < PART_SIZE {
                        continue;
                    }
                }
                None => finished = true,
            }

            // An empty final part is only sent when it is the only one
            if buffer.is_empty() && !parts.is_empty() {
                break;
            }

            let part_number = i32::try_from(parts.len().saturating_add(1))
                .map_err(|_| StorageError::backend("upload part", "too many parts"))?;
            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(S3ByteStream::from(buffer.split().freeze()))
                .send()
                .await
                .map_err(|e| StorageError::backend(format!("upload part {part_number}"), e))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(response.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }

        Ok((parts, written))
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn put_stream(&self, key: &str, mut body: ByteStream<'_>) -> Result<u64> {
        let multipart = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/octet-stream")
            .send()
            .await
            .map_err(|e| StorageError::backend("create multipart upload", e))?;

        let upload_id = multipart
            .upload_id()
            .ok_or_else(|| StorageError::backend("create multipart upload", "no upload id returned"))?
            .to_string();

        let (parts, written) = match self.upload_parts(key, &upload_id, &mut body).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(key = %key, error = %abort, "Failed to abort multipart upload");
                }
                return Err(e);
            }
        };

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
            .send()
            .await
            .map_err(|e| StorageError::backend("complete multipart upload", e))?;

        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream<'static>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::backend(format!("get {key}"), e)
                }
            })?;

        Ok(Box::pin(ReaderStream::new(object.body.into_async_read())))
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
