use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Failure reported by the object-storage SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// HTTP status of the service response, when there was one.
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = Result<T, BackendError>;

/// The SDK calls the TOS client needs, scoped to one bucket.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    fn bucket(&self) -> &str;

    async fn head_bucket(&self) -> BackendResult<()>;
    /// Create the bucket with a private ACL.
    async fn create_bucket(&self) -> BackendResult<()>;

    async fn put_object(&self, key: &str, content: Vec<u8>) -> BackendResult<()>;
    async fn get_object(&self, key: &str) -> BackendResult<Vec<u8>>;
    async fn delete_object(&self, key: &str) -> BackendResult<()>;

    /// Signed GET URL valid for `expires`.
    async fn presign_get(&self, key: &str, expires: Duration) -> BackendResult<String>;
}
