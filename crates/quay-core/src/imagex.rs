use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{QuayError, QuayResult};

/// Path on the application host that accepts upload applications.
pub const APPLY_UPLOAD_ACTION_URI: &str = "/api/common/upload/apply_upload_action";

const TOKEN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default lifetime of an upload token.
pub const DEFAULT_UPLOAD_AUTH_EXPIRE: Duration = Duration::from_secs(60 * 60);

/// Temporary upload credentials handed to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityToken {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expired_time: String,
    pub current_time: String,
    pub host_scheme: String,
}

impl SecurityToken {
    /// A credential-less token. Uploads go through the application host, so
    /// only the scheme and validity window matter.
    pub fn anonymous(scheme: &str, now: DateTime<Local>, expire: Duration) -> QuayResult<Self> {
        let expire = chrono::Duration::from_std(expire)
            .map_err(|e| QuayError::Config(format!("invalid upload auth expiry: {e}")))?;
        let expired = now.checked_add_signed(expire).ok_or_else(|| {
            QuayError::Config(format!("upload auth expiry out of range: {expire}"))
        })?;
        Ok(Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            expired_time: expired.format(TOKEN_TIME_FORMAT).to_string(),
            current_time: now.format(TOKEN_TIME_FORMAT).to_string(),
            host_scheme: scheme.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUrl {
    pub url: String,
}

/// Image hosting capability: where to upload and how to fetch back.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload endpoint on the current request host, or empty if unknown.
    fn upload_host(&self, ctx: &RequestContext) -> String {
        match ctx.host() {
            Some(host) => format!("{host}{APPLY_UPLOAD_ACTION_URI}"),
            None => String::new(),
        }
    }

    fn server_id(&self) -> String;

    async fn upload_auth(&self, ctx: &RequestContext) -> QuayResult<SecurityToken> {
        self.upload_auth_with_expire(ctx, DEFAULT_UPLOAD_AUTH_EXPIRE)
            .await
    }

    async fn upload_auth_with_expire(
        &self,
        ctx: &RequestContext,
        expire: Duration,
    ) -> QuayResult<SecurityToken>;

    async fn resource_url(&self, ctx: &RequestContext, uri: &str) -> QuayResult<ResourceUrl>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_anonymous_token_window() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        let token = SecurityToken::anonymous("https", now, DEFAULT_UPLOAD_AUTH_EXPIRE).unwrap();
        assert_eq!(token.current_time, "2025-03-01 23:30:00");
        assert_eq!(token.expired_time, "2025-03-02 00:30:00");
        assert_eq!(token.host_scheme, "https");
        assert!(token.access_key_id.is_empty());
        assert!(token.secret_access_key.is_empty());
        assert!(token.session_token.is_empty());
    }

    #[test]
    fn test_token_serializes_snake_case() {
        let now = Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let token = SecurityToken::anonymous("http", now, Duration::from_secs(60)).unwrap();
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["host_scheme"], "http");
        assert_eq!(json["expired_time"], "2025-01-01 00:01:00");
    }

    #[test]
    fn test_anonymous_token_rejects_huge_expiry() {
        let err = SecurityToken::anonymous("https", Local::now(), Duration::from_secs(1 << 50))
            .unwrap_err();
        assert!(matches!(err, QuayError::Config(_)));
        assert!(err.to_string().contains("expiry"));
    }

    struct NoopHost;

    #[async_trait]
    impl ImageHost for NoopHost {
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

        async fn resource_url(&self, _ctx: &RequestContext, uri: &str) -> QuayResult<ResourceUrl> {
            Ok(ResourceUrl { url: uri.into() })
        }
    }

    #[test]
    fn test_upload_host_uses_request_host() {
        let ctx = RequestContext::new().with_host("studio.local:8888");
        assert_eq!(
            NoopHost.upload_host(&ctx),
            "studio.local:8888/api/common/upload/apply_upload_action"
        );
        assert_eq!(NoopHost.upload_host(&RequestContext::new()), "");
    }

    #[tokio::test]
    async fn test_default_upload_auth_delegates() {
        let ctx = RequestContext::new().with_scheme("https");
        let token = NoopHost.upload_auth(&ctx).await.unwrap();
        assert_eq!(token.host_scheme, "https");

        let err = NoopHost.upload_auth(&RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, QuayError::MissingContext("scheme")));
    }
}
