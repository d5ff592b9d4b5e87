//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (session database)
//!
//! # Catalog
//! GET  /categories             - Active categories
//! GET  /categories/{id}        - Category products
//! GET  /products/{id}          - Product detail
//! GET  /search                 - Product search (?q=&category_id=)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (badge fragment, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Favorites
//! GET  /favorites              - Favorites page
//! POST /favorites/toggle       - Toggle favorite (button fragment)
//!
//! # Checkout
//! GET  /checkout               - Customer details form
//! POST /checkout               - Validate details
//! GET  /checkout/cities        - City select options (fragment)
//! GET  /checkout/payment       - Payment method selection
//! POST /checkout/payment       - Submit order (rate limited)
//!
//! # Orders
//! GET  /orders                 - Last order
//! POST /orders/cancel          - Cancel last order
//!
//! POST /consent                - Record tracking consent
//! ```

pub mod cart;
pub mod categories;
pub mod checkout;
pub mod consent;
pub mod favorites;
pub mod health;
pub mod home;
pub mod not_found;
pub mod orders;
pub mod products;
pub mod search;

use axum::{
    Router,
    handler::Handler,
    routing::{get, post},
};

use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{id}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/toggle", post(favorites::toggle))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(checkout::show_details).post(checkout::submit_details),
        )
        .route("/cities", get(checkout::cities))
        .route(
            "/payment",
            get(checkout::show_payment)
                .post(checkout::submit_order.layer(checkout_rate_limiter())),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::show))
        .route("/cancel", post(orders::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Catalog
        .nest("/categories", category_routes())
        .route("/products/{id}", get(products::show))
        .route("/search", get(search::search))
        // Visitor state
        .nest("/cart", cart_routes())
        .nest("/favorites", favorite_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .route("/consent", post(consent::set_consent))
        .fallback(not_found::not_found)
}
