//! Client for the multi-tenant store REST API.
//!
//! # Architecture
//!
//! - The API is the source of truth for products, categories, orders and
//!   payments. The storefront keeps no catalog of its own.
//! - Every response is wrapped in `{ "data": ... }`; the client unwraps it.
//! - Every request has a client-side timeout. There are no retries.
//! - Store data, categories, countries, product listings and product details
//!   are cached in memory via `moka`. Searches are not cached.
//!
//! # Example
//!
//! ```rust,ignore
//! use souq_storefront::api::{ApiClient, ProductFilter};
//!
//! let client = ApiClient::new(&config.api)?;
//! let store = client.store_data().await?;
//! let products = client.products(&ProductFilter::default()).await?;
//! ```

mod cache;
mod client;
pub mod types;

use std::time::Duration;

pub use client::ApiClient;
pub use types::*;

use souq_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur when talking to the store API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not finish within the client timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Network(#[source] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        /// Message from the API's error body, if it had one.
        message: Option<String>,
    },

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// The failure category pages use to pick a fallback.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Network(_) | Self::Status { .. } | Self::Parse(_) | Self::Url(_) => {
                ErrorKind::Network
            }
        }
    }

    /// Message safe to show to visitors.
    ///
    /// Client errors (4xx) carry the API's own message when it sent one, e.g.
    /// an out-of-stock notice at checkout.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                status: 400..=499,
                message: Some(message),
            } => message.clone(),
            _ => self.kind().user_message().to_string(),
        }
    }
}

/// Result of a fetch as a page sees it: data, or a failure to render a
/// fallback for.
#[derive(Debug, Clone)]
pub enum Loadable<T> {
    Ready(T),
    Failed { kind: ErrorKind, message: String },
}

impl<T> Loadable<T> {
    /// Convert a fetch result, logging failures.
    pub fn from_result(result: Result<T, ApiError>, what: &str) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => {
                tracing::warn!(error = %e, kind = %e.kind(), what, "Store API fetch failed");
                Self::Failed {
                    kind: e.kind(),
                    message: e.user_message(),
                }
            }
        }
    }

    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Visitor-facing error message, if the fetch failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Ready(_) => None,
            Self::Failed { message, .. } => Some(message.clone()),
        }
    }

    /// Transform the data, keeping failures.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        match self {
            Self::Ready(value) => Loadable::Ready(f(value)),
            Self::Failed { kind, message } => Loadable::Failed { kind, message },
        }
    }

    /// Split into the parts templates use: the data (or its default) and the
    /// error message.
    pub fn into_parts(self) -> (T, Option<String>)
    where
        T: Default,
    {
        match self {
            Self::Ready(value) => (value, None),
            Self::Failed { message, .. } => (T::default(), Some(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(10)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ApiError::NotFound("product 1".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ApiError::Status {
                status: 500,
                message: None
            }
            .kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn test_user_message_prefers_api_message_for_client_errors() {
        let err = ApiError::Status {
            status: 422,
            message: Some("الكمية غير متوفرة".to_string()),
        };
        assert_eq!(err.user_message(), "الكمية غير متوفرة");

        let err = ApiError::Status {
            status: 503,
            message: Some("upstream down".to_string()),
        };
        assert_eq!(err.user_message(), ErrorKind::Network.user_message());
    }

    #[test]
    fn test_loadable_into_parts() {
        let failed: Loadable<Vec<u8>> = Loadable::from_result(
            Err(ApiError::Timeout(Duration::from_secs(1))),
            "test",
        );
        let (data, error) = failed.into_parts();
        assert!(data.is_empty());
        assert_eq!(error.as_deref(), Some(ErrorKind::Timeout.user_message()));

        let ready = Loadable::from_result(Ok(vec![1u8]), "test").map(|v| v.len());
        assert_eq!(ready.ready(), Some(&1));
    }
}
