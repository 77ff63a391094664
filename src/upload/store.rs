//! Object store abstraction

use crate::utils::error::AppResult;
use async_trait::async_trait;
use std::time::Duration;

/// One object to write
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub acl: String,
}

/// What the store reports back after a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    /// Provider URL of the object
    pub location: String,
}

/// Remote storage the finished recording is handed to.
///
/// Implementations surface transport failures as
/// [`AppError::UploadFailed`](crate::utils::error::AppError::UploadFailed)
/// carrying the provider's message.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, request: PutRequest) -> AppResult<StoredObject>;

    /// Time-limited GET URL for `key`
    async fn presign_get(&self, key: &str, expiry: Duration) -> AppResult<String>;
}
