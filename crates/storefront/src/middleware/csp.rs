//! Per-request nonce shared by the `Content-Security-Policy` header and the
//! inline `<script>`/`<style>` tags of the page (pixel loaders, htmx, the
//! accent colour).

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// Random bytes per nonce (128 bits).
const NONCE_BYTES: usize = 16;

/// Base64 nonce allowing this response's inline tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspNonce(pub String);

impl CspNonce {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// The bare value, for `nonce="..."` attributes.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// The policy source expression, `'nonce-...'`.
    #[must_use]
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

/// Attach a fresh nonce to the request. Runs inside the security headers
/// layer, which reads it back for the policy.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    /// Without the middleware the nonce is empty and inline tags are blocked.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!("No CSP nonce on request; inline scripts will be blocked");
            Self(String::new())
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        let a = CspNonce::generate();
        let b = CspNonce::generate();
        assert_ne!(a, b);
        assert_eq!(a.value().len(), 24);
        assert_eq!(a.source(), format!("'nonce-{}'", a.value()));
    }

    #[tokio::test]
    async fn test_handler_sees_middleware_nonce() {
        let app = Router::new()
            .route("/", get(|nonce: CspNonce| async move { nonce.0 }))
            .layer(axum::middleware::from_fn(csp_nonce_middleware));

        let response = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.len(), 24);
    }
}
