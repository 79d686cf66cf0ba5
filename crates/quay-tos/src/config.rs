use serde::Deserialize;

/// Connection settings for a TOS bucket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TosConfig {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Host or URL of the S3-compatible endpoint, e.g. `tos-s3-cn-beijing.volces.com`.
    pub endpoint: String,
    pub region: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    /// Needed for MinIO and other gateways without wildcard DNS.
    pub force_path_style: bool,
}

impl TosConfig {
    /// Endpoint as a URL; a bare host is assumed to speak HTTPS.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("https://{}", self.endpoint)
        }
    }
}
