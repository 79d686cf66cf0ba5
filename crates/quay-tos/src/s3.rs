use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::BucketCannedAcl;
use aws_sdk_s3::Client;

use crate::backend::{BackendError, BackendResult, ObjectBackend};
use crate::config::TosConfig;

const CREDENTIALS_PROVIDER: &str = "quay-tos-static";

/// `ObjectBackend` over the S3-compatible TOS endpoint.
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(config: &TosConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .force_path_style(config.force_path_style)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> BackendError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|resp| resp.status().as_u16());
    BackendError::new(status, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl ObjectBackend for S3Backend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> BackendResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn create_bucket(&self) -> BackendResult<()> {
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .acl(BucketCannedAcl::Private)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn put_object(&self, key: &str, content: Vec<u8>) -> BackendResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> BackendResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_type("application/json")
            .response_content_encoding("deflate")
            .send()
            .await
            .map_err(sdk_error)?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BackendError::new(None, format!("reading object body: {e}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete_object(&self, key: &str) -> BackendResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires: Duration) -> BackendResult<String> {
        let presigning = PresigningConfig::expires_in(expires)
            .map_err(|e| BackendError::new(None, format!("invalid presign expiry: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;
        Ok(request.uri().to_string())
    }
}
