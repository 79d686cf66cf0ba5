use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tracing::{debug, info};

use quay_core::{
    ImageHost, QuayError, QuayResult, RequestContext, ResourceUrl, SecurityToken, Storage,
};

use crate::backend::{BackendError, ObjectBackend};
use crate::config::TosConfig;
use crate::proxy::{proxy_endpoint_from_env, rewrite_signed_url};
use crate::s3::S3Backend;

/// Lifetime of presigned GET URLs.
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(60 * 60 * 24);

/// Storage and image hosting on a single TOS bucket.
pub struct TosClient<B = S3Backend> {
    backend: B,
    proxy_endpoint: Option<String>,
}

impl TosClient<S3Backend> {
    /// Connect to the configured bucket, creating it if it does not exist.
    pub async fn connect(config: &TosConfig) -> QuayResult<Self> {
        if config.bucket.is_empty() {
            return Err(QuayError::Config("TOS bucket name is required".into()));
        }
        if config.endpoint.is_empty() {
            return Err(QuayError::Config("TOS endpoint is required".into()));
        }

        let client = Self::new(S3Backend::new(config));
        client.check_and_create_bucket().await.map_err(|e| {
            QuayError::Storage(format!(
                "new tos client failed, bucket: {}, endpoint: {}, region: {}, err: {e}",
                config.bucket, config.endpoint, config.region
            ))
        })?;
        Ok(client)
    }
}

impl<B: ObjectBackend> TosClient<B> {
    /// Wrap an existing backend. The proxy endpoint is taken from the
    /// environment; no bucket check is made.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            proxy_endpoint: proxy_endpoint_from_env(),
        }
    }

    pub fn with_proxy_endpoint(mut self, proxy_endpoint: Option<String>) -> Self {
        self.proxy_endpoint = proxy_endpoint.filter(|p| !p.is_empty());
        self
    }

    pub fn bucket(&self) -> &str {
        self.backend.bucket()
    }

    /// Head the bucket and create it (private ACL) when the service answers 404.
    pub async fn check_and_create_bucket(&self) -> QuayResult<()> {
        let bucket = self.backend.bucket();
        match self.backend.head_bucket().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(bucket, "bucket not found, creating");
                let created = self.backend.create_bucket().await;
                info!(bucket, ok = created.is_ok(), "bucket create finished");
                created.map_err(|e| storage_error("create_bucket", bucket, e))
            }
            Err(e) => Err(storage_error("head_bucket", bucket, e)),
        }
    }
}

fn storage_error(op: &str, target: &str, err: BackendError) -> QuayError {
    QuayError::Storage(format!("{op} {target}: {err}"))
}

#[async_trait]
impl<B: ObjectBackend> Storage for TosClient<B> {
    async fn put_object(&self, key: &str, content: Vec<u8>) -> QuayResult<()> {
        let size = content.len();
        self.backend
            .put_object(key, content)
            .await
            .map_err(|e| storage_error("put_object", key, e))?;
        debug!(key, size, "put object");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> QuayResult<Vec<u8>> {
        self.backend
            .get_object(key)
            .await
            .map_err(|e| storage_error("get_object", key, e))
    }

    async fn delete_object(&self, key: &str) -> QuayResult<()> {
        self.backend
            .delete_object(key)
            .await
            .map_err(|e| storage_error("delete_object", key, e))
    }

    async fn get_object_url(&self, ctx: &RequestContext, key: &str) -> QuayResult<String> {
        let signed = self
            .backend
            .presign_get(key, SIGNED_URL_EXPIRY)
            .await
            .map_err(|e| storage_error("get_object_url", key, e))?;
        Ok(rewrite_signed_url(
            &signed,
            self.proxy_endpoint.as_deref(),
            ctx,
        ))
    }
}

#[async_trait]
impl<B: ObjectBackend> ImageHost for TosClient<B> {
    fn server_id(&self) -> String {
        String::new()
    }

    async fn upload_auth_with_expire(
        &self,
        ctx: &RequestContext,
        expire: Duration,
    ) -> QuayResult<SecurityToken> {
        let scheme = ctx.scheme().ok_or(QuayError::MissingContext("scheme"))?;
        SecurityToken::anonymous(scheme, Local::now(), expire)
    }

    async fn resource_url(&self, ctx: &RequestContext, uri: &str) -> QuayResult<ResourceUrl> {
        let url = self.get_object_url(ctx, uri).await?;
        Ok(ResourceUrl { url })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::backend::BackendResult;

    /// In-memory bucket. `head_status` makes `head_bucket` fail with that
    /// status; `create_fails` makes `create_bucket` fail.
    struct MemoryBackend {
        head_status: Option<u16>,
        create_fails: bool,
        created: Mutex<bool>,
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryBackend {
        fn new() -> Self {
            Self {
                head_status: None,
                create_fails: false,
                created: Mutex::new(false),
                objects: Mutex::new(HashMap::new()),
            }
        }

        fn failing_head(status: u16) -> Self {
            Self {
                head_status: Some(status),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ObjectBackend for MemoryBackend {
        fn bucket(&self) -> &str {
            "opencoze"
        }

        async fn head_bucket(&self) -> BackendResult<()> {
            match self.head_status {
                Some(status) => Err(BackendError::new(Some(status), "head failed")),
                None => Ok(()),
            }
        }

        async fn create_bucket(&self) -> BackendResult<()> {
            if self.create_fails {
                return Err(BackendError::new(Some(409), "BucketAlreadyExists"));
            }
            *self.created.lock().unwrap() = true;
            Ok(())
        }

        async fn put_object(&self, key: &str, content: Vec<u8>) -> BackendResult<()> {
            self.objects.lock().unwrap().insert(key.into(), content);
            Ok(())
        }

        async fn get_object(&self, key: &str) -> BackendResult<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| BackendError::new(Some(404), "NoSuchKey"))
        }

        async fn delete_object(&self, key: &str) -> BackendResult<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn presign_get(&self, key: &str, expires: Duration) -> BackendResult<String> {
            Ok(format!(
                "https://opencoze.tos-cn-beijing.volces.com/{key}?X-Tos-Expires={}",
                expires.as_secs()
            ))
        }
    }

    fn client(backend: MemoryBackend) -> TosClient<MemoryBackend> {
        TosClient::new(backend).with_proxy_endpoint(None)
    }

    #[tokio::test]
    async fn test_existing_bucket_is_not_created() {
        let tos = client(MemoryBackend::new());
        tos.check_and_create_bucket().await.unwrap();
        assert!(!*tos.backend.created.lock().unwrap());
    }

    #[tokio::test]
    async fn test_missing_bucket_is_created() {
        let tos = client(MemoryBackend::failing_head(404));
        tos.check_and_create_bucket().await.unwrap();
        assert!(*tos.backend.created.lock().unwrap());
    }

    #[tokio::test]
    async fn test_create_bucket_failure_surfaces() {
        let backend = MemoryBackend {
            create_fails: true,
            ..MemoryBackend::failing_head(404)
        };
        let tos = client(backend);
        let err = tos.check_and_create_bucket().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "storage error: create_bucket opencoze: status 409: BucketAlreadyExists"
        );
    }

    #[tokio::test]
    async fn test_connect_requires_bucket_and_endpoint() {
        let no_bucket = TosConfig {
            endpoint: "tos-s3-cn-beijing.volces.com".into(),
            ..Default::default()
        };
        let err = TosClient::connect(&no_bucket).await.err().unwrap();
        assert_eq!(err.to_string(), "config error: TOS bucket name is required");

        let no_endpoint = TosConfig {
            bucket: "opencoze".into(),
            ..Default::default()
        };
        let err = TosClient::connect(&no_endpoint).await.err().unwrap();
        assert_eq!(err.to_string(), "config error: TOS endpoint is required");
    }

    #[tokio::test]
    async fn test_other_head_errors_surface() {
        let tos = client(MemoryBackend::failing_head(403));
        let err = tos.check_and_create_bucket().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "storage error: head_bucket opencoze: status 403: head failed"
        );
        assert!(!*tos.backend.created.lock().unwrap());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let tos = client(MemoryBackend::new());
        tos.put_object("docs/a.txt", b"hello world".to_vec())
            .await
            .unwrap();
        assert_eq!(tos.get_object("docs/a.txt").await.unwrap(), b"hello world");

        tos.delete_object("docs/a.txt").await.unwrap();
        let err = tos.get_object("docs/a.txt").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "storage error: get_object docs/a.txt: status 404: NoSuchKey"
        );
    }

    #[tokio::test]
    async fn test_signed_url_uses_day_expiry() {
        let tos = client(MemoryBackend::new());
        let url = tos
            .get_object_url(&RequestContext::new(), "img/cat.png")
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://opencoze.tos-cn-beijing.volces.com/img/cat.png?X-Tos-Expires=86400"
        );
    }

    #[tokio::test]
    async fn test_signed_url_through_proxy() {
        let tos = client(MemoryBackend::new()).with_proxy_endpoint(Some(":8889".into()));
        let ctx = RequestContext::new()
            .with_host("127.0.0.1:8888")
            .with_scheme("http");
        let resource = tos.resource_url(&ctx, "img/cat.png").await.unwrap();
        assert_eq!(
            resource.url,
            "http://127.0.0.1:8889/img/cat.png?X-Tos-Expires=86400"
        );
    }

    #[tokio::test]
    async fn test_upload_auth_requires_scheme() {
        let tos = client(MemoryBackend::new());
        let err = tos.upload_auth(&RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, QuayError::MissingContext("scheme")));

        let ctx = RequestContext::new().with_scheme("https");
        let token = tos.upload_auth(&ctx).await.unwrap();
        assert_eq!(token.host_scheme, "https");
        assert!(token.access_key_id.is_empty());
    }

    #[tokio::test]
    async fn test_image_host_identity() {
        let tos = client(MemoryBackend::new());
        assert_eq!(tos.server_id(), "");
        let ctx = RequestContext::new().with_host("studio.local");
        assert_eq!(
            tos.upload_host(&ctx),
            "studio.local/api/common/upload/apply_upload_action"
        );
    }
}
