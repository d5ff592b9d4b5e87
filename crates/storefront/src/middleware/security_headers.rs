//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! The policy starts locked down. Scripts need the request's CSP nonce;
//! `'strict-dynamic'` lets the nonce'd pixel loaders pull their vendor
//! scripts. Product and banner images come from the API's media hosts, so
//! `img-src` allows any HTTPS origin and COEP is not sent.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;
use crate::services::pixels::{PIXEL_CONNECT_HOSTS, PIXEL_SCRIPT_HOSTS};

/// Where the htmx script is served from.
pub const HTMX_HOST: &str = "https://unpkg.com";

/// Build the `Content-Security-Policy` value for a request.
#[must_use]
pub fn content_security_policy(nonce: Option<&CspNonce>) -> String {
    let style_nonce = nonce
        .map(|n| format!(" {}", n.source()))
        .unwrap_or_default();
    let nonce = nonce
        .map(|n| format!(" {} 'strict-dynamic'", n.source()))
        .unwrap_or_default();
    let script_hosts = PIXEL_SCRIPT_HOSTS.join(" ");
    let connect_hosts = PIXEL_CONNECT_HOSTS.join(" ");

    format!(
        "default-src 'none'; \
         script-src 'self' {HTMX_HOST} {script_hosts}{nonce}; \
         style-src 'self'{style_nonce}; \
         font-src 'self'; \
         img-src 'self' data: https:; \
         connect-src 'self' {connect_hosts}; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self' https:; \
         frame-ancestors 'none'; \
         upgrade-insecure-requests"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin` (pixels attribute by page)
/// - `Content-Security-Policy` (see [`content_security_policy`])
/// - `Permissions-Policy` denying sensitive features
/// - `Cache-Control: no-store, max-age=0` unless the handler set one
/// - `Cross-Origin-Opener-Policy: same-origin`
/// - `Cross-Origin-Resource-Policy: same-origin`
/// - `X-DNS-Prefetch-Control: off`
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let csp = content_security_policy(request.extensions().get::<CspNonce>());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid Content-Security-Policy value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             hid=(), \
             interest-cohort=(), \
             magnetometer=(), \
             microphone=(), \
             midi=(), \
             payment=(), \
             serial=(), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_carries_nonce_and_pixel_hosts() {
        let nonce = CspNonce("abc123".to_string());
        let csp = content_security_policy(Some(&nonce));
        assert!(csp.contains("'nonce-abc123'"));
        assert!(csp.contains("'strict-dynamic'"));
        assert!(csp.contains("https://connect.facebook.net"));
        assert!(csp.contains("https://analytics.tiktok.com"));
        assert!(csp.contains(HTMX_HOST));
    }

    #[test]
    fn test_policy_without_nonce() {
        let csp = content_security_policy(None);
        assert!(!csp.contains("nonce-"));
        assert!(csp.starts_with("default-src 'none'"));
    }
}
