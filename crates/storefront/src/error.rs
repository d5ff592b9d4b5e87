//! Unified error handling with Sentry integration.
//!
//! Store API failures never reach this type: pages degrade to fallbacks
//! instead. What remains are session failures, which are captured to
//! Sentry before an Arabic error page is rendered.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::filters;
use crate::stores::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session-backed state could not be read or written.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Standalone error page; it must render without store data.
#[derive(Template)]
#[template(path = "errors/error.html")]
struct ErrorPage<'a> {
    status: u16,
    message: &'a str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to visitors. Internal details never leak.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Store(_) => "حدث خطأ غير متوقع، حاول مرة أخرى",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        let status = self.status();
        let message = self.user_message();
        let page = ErrorPage {
            status: status.as_u16(),
            message,
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, message).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for visitor actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session_failure() -> AppError {
        StoreError::Unavailable("Can't extract session. Is `SessionManagerLayer` enabled?").into()
    }

    #[test]
    fn test_app_error_display() {
        assert_eq!(
            session_failure().to_string(),
            "Store error: session unavailable: Can't extract session. Is `SessionManagerLayer` enabled?"
        );
    }

    #[tokio::test]
    async fn test_error_page_hides_internal_details() {
        let response = session_failure().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("SessionManagerLayer"));
        assert!(body.contains("حدث خطأ غير متوقع"));
        assert!(body.contains("dir=\"rtl\""));
    }
}
