//! Upload handoff
//!
//! Turns a finalized recording into a shareable URL: name it, store it,
//! then derive the URL with the configured policy.

use super::naming::{ObjectNamer, CONTENT_TYPE};
use super::s3::S3Store;
use super::store::{ObjectStore, PutRequest};
use crate::config::{StorageConfig, UrlPolicy};
use crate::recorder::state::FinishedRecording;
use crate::utils::error::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which policy produced the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlDerivation {
    Signed,
    Prefixed,
    Location,
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub url: String,
    pub key: String,
    pub derivation: UrlDerivation,
    pub size_bytes: usize,
}

pub struct UploadHandoff {
    store: Arc<dyn ObjectStore>,
    namer: ObjectNamer,
    acl: String,
    policy: UrlPolicy,
}

impl UploadHandoff {
    pub fn new(store: Arc<dyn ObjectStore>, acl: impl Into<String>, policy: UrlPolicy) -> Self {
        Self {
            store,
            namer: ObjectNamer::new(),
            acl: acl.into(),
            policy,
        }
    }

    /// Handoff to the S3 bucket described by `config`
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            Arc::new(S3Store::new(config)),
            config.acl.clone(),
            config.url_policy.clone(),
        )
    }

    /// Store the recording and derive its URL.
    ///
    /// Single attempt; a failure is returned as-is.
    pub async fn upload(&self, recording: FinishedRecording) -> AppResult<UploadResult> {
        let key = self.namer.next_key()?;
        let size_bytes = recording.data.len();

        tracing::info!(
            session = %recording.session_id,
            "Handing off {} bytes as {}",
            size_bytes,
            key
        );

        let stored = self
            .store
            .put_object(PutRequest {
                key: key.clone(),
                body: recording.data,
                content_type: CONTENT_TYPE,
                acl: self.acl.clone(),
            })
            .await?;

        let (url, derivation) = match &self.policy {
            UrlPolicy::Presigned { expiry } => (
                self.store.presign_get(&stored.key, *expiry).await?,
                UrlDerivation::Signed,
            ),
            UrlPolicy::Prefix(prefix) => (
                format!("{}{}", prefix, urlencoding::encode(&stored.key)),
                UrlDerivation::Prefixed,
            ),
            UrlPolicy::Location => (stored.location.clone(), UrlDerivation::Location),
        };

        tracing::info!("Upload complete: {} ({:?})", url, derivation);

        Ok(UploadResult {
            url,
            key,
            derivation,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::store::StoredObject;
    use crate::utils::error::AppError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryStore {
        puts: Mutex<Vec<PutRequest>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put_object(&self, request: PutRequest) -> AppResult<StoredObject> {
            if let Some(message) = &self.fail_with {
                return Err(AppError::UploadFailed(message.clone()));
            }
            let stored = StoredObject {
                key: request.key.clone(),
                location: format!("https://bucket.example/{}", request.key),
            };
            self.puts.lock().push(request);
            Ok(stored)
        }

        async fn presign_get(&self, key: &str, expiry: Duration) -> AppResult<String> {
            Ok(format!(
                "https://bucket.example/{}?X-Amz-Expires={}&X-Amz-Signature=abc",
                key,
                expiry.as_secs()
            ))
        }
    }

    fn recording(data: &[u8]) -> FinishedRecording {
        FinishedRecording {
            session_id: Uuid::new_v4(),
            tracks: Vec::new(),
            duration_ms: 1000,
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_location_policy() {
        let store = Arc::new(MemoryStore::default());
        let handoff = UploadHandoff::new(store.clone(), "public-read", UrlPolicy::Location);

        let result = handoff.upload(recording(b"webm")).await.unwrap();

        assert_eq!(result.derivation, UrlDerivation::Location);
        assert_eq!(result.url, format!("https://bucket.example/{}", result.key));
        assert_eq!(result.size_bytes, 4);

        let puts = store.puts.lock();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].content_type, "video/webm");
        assert_eq!(puts[0].acl, "public-read");
        assert_eq!(puts[0].body, b"webm".to_vec());
    }

    #[tokio::test]
    async fn test_presign_wins_even_with_prefix_configured() {
        let policy = UrlPolicy::resolve(true, 3600, Some("https://cdn.example.com"));
        let handoff = UploadHandoff::new(Arc::new(MemoryStore::default()), "private", policy);

        let result = handoff.upload(recording(b"webm")).await.unwrap();

        assert_eq!(result.derivation, UrlDerivation::Signed);
        assert!(result.url.contains("X-Amz-Signature"));
        assert!(result.url.contains("X-Amz-Expires=3600"));
        assert!(!result.url.starts_with("https://cdn.example.com"));
    }

    #[tokio::test]
    async fn test_prefix_policy() {
        let policy = UrlPolicy::resolve(false, 3600, Some("https://cdn.example.com/clips"));
        let handoff = UploadHandoff::new(Arc::new(MemoryStore::default()), "public-read", policy);

        let result = handoff.upload(recording(b"webm")).await.unwrap();

        assert_eq!(result.derivation, UrlDerivation::Prefixed);
        assert_eq!(result.url, format!("https://cdn.example.com/clips/{}", result.key));
    }

    #[tokio::test]
    async fn test_failure_is_surfaced_verbatim() {
        let store = MemoryStore {
            fail_with: Some("AccessDenied: Access Denied".to_string()),
            ..Default::default()
        };
        let handoff = UploadHandoff::new(Arc::new(store), "public-read", UrlPolicy::Location);

        let err = handoff.upload(recording(b"webm")).await.unwrap_err();
        assert_eq!(err.to_string(), "AccessDenied: Access Denied");
    }

    #[tokio::test]
    async fn test_sequential_uploads_get_increasing_keys() {
        let handoff = UploadHandoff::new(
            Arc::new(MemoryStore::default()),
            "public-read",
            UrlPolicy::Location,
        );
        let first = handoff.upload(recording(b"one")).await.unwrap();
        let second = handoff.upload(recording(b"two")).await.unwrap();
        assert_ne!(first.key, second.key);
        assert!(first.key < second.key);
    }
}
