//! # S3 store
//!
//! Attachments live in a bucket; browsers fetch them directly with presigned
//! GET URLs, so the board never proxies image bytes in this mode.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use domains::{AppError, AttachmentKey, AttachmentStore, Result, Upload};

pub struct S3AttachmentStore {
    client: Client,
    bucket: String,
}

impl S3AttachmentStore {
    /// Credentials come from the standard AWS provider chain (env, profile,
    /// instance metadata). `endpoint` switches to path-style addressing for
    /// S3-compatible services.
    pub async fn connect(bucket: String, region: String, endpoint: Option<String>) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::with_client(Client::from_conf(builder.build()), bucket)
    }

    pub fn with_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

fn unavailable(action: &str, key: &AttachmentKey, err: impl std::error::Error) -> AppError {
    AppError::StorageUnavailable(format!("s3 {action} {key}: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    async fn put(&self, key: &AttachmentKey, upload: Upload) -> Result<()> {
        let size = upload.bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(upload.content_type.to_string())
            .body(ByteStream::from(upload.bytes))
            .send()
            .await
            .map_err(|e| unavailable("put", key, e))?;

        tracing::debug!(%key, bucket = %self.bucket, size, "attachment uploaded");
        Ok(())
    }

    async fn signed_url(&self, key: &AttachmentKey, ttl: Duration) -> Result<String> {
        let config = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::Internal(format!("invalid presign ttl: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(config)
            .await
            .map_err(|e| unavailable("presign", key, e))?;

        Ok(request.uri().to_string())
    }

    async fn fetch(&self, key: &AttachmentKey) -> Result<Option<Bytes>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    return Ok(None);
                }
                return Err(unavailable("get", key, service));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| unavailable("read", key, e))?;
        Ok(Some(data.into_bytes()))
    }
}
