use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object storage error: {0}")]
    Backend(String),
}

/// Opaque key/value blob storage for uploaded documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `suggested_path` and returns the path to fetch
    /// them back with.
    async fn store(
        &self,
        bytes: Bytes,
        suggested_path: &str,
        content_type: &str,
    ) -> Result<String, BlobError>;

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, BlobError>;
}

/// S3 (or MinIO) bucket.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(
        &self,
        bytes: Bytes,
        suggested_path: &str,
        content_type: &str,
    ) -> Result<String, BlobError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(suggested_path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("S3 upload failed: {e}")))?;

        info!(
            "Uploaded {size} bytes to s3://{}/{}",
            self.bucket, suggested_path
        );
        Ok(suggested_path.to_string())
    }

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, BlobError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_path)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    BlobError::NotFound(storage_path.to_string())
                } else {
                    BlobError::Backend(format!("S3 download failed: {e}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend(format!("S3 body read failed: {e}")))?;
        Ok(data.into_bytes())
    }
}

/// Object key for an upload: `resumes/<uuid>.<ext>`.
pub fn resume_object_key(id: uuid::Uuid, extension: &str) -> String {
    format!("resumes/{id}.{extension}")
}
