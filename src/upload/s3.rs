//! S3-compatible object store

use super::store::{ObjectStore, PutRequest, StoredObject};
use crate::config::StorageConfig;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use std::time::Duration;

/// Store backed by the AWS SDK, usable with any S3-compatible endpoint
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.access_secret.clone(),
            None,
            None,
            "clipshare-environment",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            // Most S3-compatible services only route path-style requests
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            "S3 store for bucket {} in {} ({})",
            config.bucket,
            config.region,
            config.endpoint.as_deref().unwrap_or("AWS endpoint")
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Public URL of `key` for this bucket
    pub fn object_location(&self, key: &str) -> String {
        object_location(&self.bucket, &self.region, self.endpoint.as_deref(), key)
    }
}

fn object_location(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    let key = urlencoding::encode(key);
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, request: PutRequest) -> AppResult<StoredObject> {
        let size = request.body.len();
        tracing::info!("Uploading {} ({} bytes) to {}", request.key, size, self.bucket);

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .send()
            .await
            .map_err(|e| AppError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(etag = ?output.e_tag(), "Stored {}", request.key);

        Ok(StoredObject {
            location: self.object_location(&request.key),
            key: request.key,
        })
    }

    async fn presign_get(&self, key: &str, expiry: Duration) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(expiry)
            .map_err(|e| AppError::UploadFailed(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
