//! End-to-end tests for a running Souq storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront against a store API
//! cargo run -p souq-storefront
//!
//! # Run the ignored tests against it
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p souq-integration-tests -- --ignored
//! ```
//!
//! The tests assume product `SOUQ_TEST_PRODUCT_ID` (default 1) exists and is
//! in stock.

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Product the cart tests add.
#[must_use]
pub fn test_product_id() -> String {
    std::env::var("SOUQ_TEST_PRODUCT_ID").unwrap_or_else(|_| "1".to_string())
}

/// A client that keeps the session cookie and does not follow redirects.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn visitor() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}
