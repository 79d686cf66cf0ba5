use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::QuayResult;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn put_object(&self, key: &str, content: Vec<u8>) -> QuayResult<()>;
    async fn get_object(&self, key: &str) -> QuayResult<Vec<u8>>;
    async fn delete_object(&self, key: &str) -> QuayResult<()>;

    /// Time-limited GET URL for `key`, adjusted for the caller's request.
    async fn get_object_url(&self, ctx: &RequestContext, key: &str) -> QuayResult<String>;
}
