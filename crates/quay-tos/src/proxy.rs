//! Rewriting of signed URLs for deployments that front object storage with a
//! local proxy (e.g. MinIO behind the web server on `:8889`).
//!
//! Browsers must fetch objects from the host they loaded the app from, so the
//! signed URL's host and scheme are swapped for the request's own host with
//! the proxy port appended.

use quay_core::RequestContext;
use tracing::warn;
use url::Url;

/// Environment variable holding the proxy's `:port` suffix.
pub const PROXY_ENDPOINT_ENV: &str = "MINIO_PROXY_ENDPOINT";

/// Proxy endpoint from the environment, if set and non-empty.
pub fn proxy_endpoint_from_env() -> Option<String> {
    std::env::var(PROXY_ENDPOINT_ENV)
        .ok()
        .filter(|v| !v.is_empty())
}

/// Point `signed_url` at `ctx`'s host plus `proxy_endpoint`.
///
/// Returns the URL untouched when there is no proxy, when the context lacks
/// host or scheme, or when the URL does not parse.
pub fn rewrite_signed_url(
    signed_url: &str,
    proxy_endpoint: Option<&str>,
    ctx: &RequestContext,
) -> String {
    let Some(proxy_endpoint) = proxy_endpoint.filter(|p| !p.is_empty()) else {
        return signed_url.to_string();
    };
    let (Some(current_host), Some(current_scheme)) = (ctx.host(), ctx.scheme()) else {
        return signed_url.to_string();
    };

    let url = match Url::parse(signed_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("[get_object_url] url parse failed, err: {e}");
            return signed_url.to_string();
        }
    };

    let authority = format!("{}{proxy_endpoint}", strip_port(current_host));
    match replace_origin(&url, current_scheme, &authority) {
        Some(rewritten) => rewritten.to_string(),
        None => {
            warn!(
                host = %authority,
                scheme = %current_scheme,
                "[get_object_url] cannot rewrite signed url for proxy"
            );
            signed_url.to_string()
        }
    }
}

/// Rebuild `url` with a new scheme and `host[:port]` authority, keeping the
/// path and the signed query string byte for byte.
fn replace_origin(url: &Url, scheme: &str, authority: &str) -> Option<Url> {
    let mut rebuilt = format!("{scheme}://{authority}{}", url.path());
    if let Some(query) = url.query() {
        rebuilt.push('?');
        rebuilt.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        rebuilt.push('#');
        rebuilt.push_str(fragment);
    }
    Url::parse(&rebuilt).ok()
}

/// Host part of `host[:port]`, handling bracketed IPv6 literals.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &host[..end + 2];
        }
        return host;
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
