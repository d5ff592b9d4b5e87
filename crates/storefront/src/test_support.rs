//! Shared helpers for tests: a fake store API and an app wired to it.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

use crate::config::{ApiConfig, StorefrontConfig};
use crate::middleware::session_layer;
use crate::state::AppState;

/// Tenant served by the fake API.
pub const TENANT: &str = "shop.example";

/// API timeout in tests; `CatalogReply::Slow` sleeps past it.
const TEST_TIMEOUT: Duration = Duration::from_secs(1);

/// How the fake API answers product detail and category requests.
#[derive(Debug, Clone, Copy, Default)]
pub enum CatalogReply {
    #[default]
    Data,
    ServerError,
    Slow,
}

/// How the fake API answers order submissions.
#[derive(Debug, Clone, Copy, Default)]
pub enum CheckoutReply {
    /// A confirmed order `SQ-{100 + n}`.
    #[default]
    Confirm,
    /// 422 with an Arabic message.
    Reject,
    /// A pending order plus a payment gateway URL.
    Gateway,
}

/// Message the fake API rejects orders with.
pub const REJECTION_MESSAGE: &str = "الكمية المطلوبة غير متوفرة";

/// Gateway URL the fake API sends visitors to.
pub const GATEWAY_URL: &str = "https://pay.example/session/abc";

/// Behaviour of the fake API, and a count of order submissions it received.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    pub catalog: CatalogReply,
    pub checkout: CheckoutReply,
    pub orders: Arc<AtomicUsize>,
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

fn product(id: i64) -> Option<Value> {
    match id {
        1 => Some(json!({
            "id": 1,
            "name": "عسل سدر",
            "description": "عسل طبيعي",
            "inventory": 12,
            "prices": [
                { "min_quantity": 1, "price_in_usd": "10.00" },
                { "min_quantity": 3, "price_in_usd": "8.00" }
            ],
            "media": [{ "id": 1, "url": "https://cdn.example/honey.jpg", "type": "image/jpeg" }],
            "reviews": [{ "id": 1, "customer_name": "سارة", "rating": 5, "body": "ممتاز" }]
        })),
        2 => Some(json!({
            "id": 2,
            "name": "زيت زيتون",
            "inventory": 0,
            "prices": [{ "min_quantity": 1, "price_in_usd": "4.50" }]
        })),
        _ => None,
    }
}

/// Delay or fail a catalog reply as configured.
async fn catalog_reply(mock: &MockApi, data: impl FnOnce() -> Response) -> Response {
    match mock.catalog {
        CatalogReply::Data => data(),
        CatalogReply::ServerError => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        CatalogReply::Slow => {
            tokio::time::sleep(TEST_TIMEOUT * 3).await;
            data()
        }
    }
}

async fn checkout_reply(State(mock): State<MockApi>) -> Response {
    let n = mock.orders.fetch_add(1, Ordering::SeqCst) + 1;
    let order = json!({
        "id": 100 + n,
        "reference": format!("SQ-{}", 100 + n),
        "status": "pending",
        "total": "20.00"
    });
    match mock.checkout {
        CheckoutReply::Confirm => Json(json!({ "data": { "order": order } })).into_response(),
        CheckoutReply::Reject => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": REJECTION_MESSAGE })),
        )
            .into_response(),
        CheckoutReply::Gateway => {
            Json(json!({ "data": { "order": order, "redirect_url": GATEWAY_URL } }))
                .into_response()
        }
    }
}

/// A fake store API for tenant `shop.example` that always has data.
pub fn mock_api() -> Router {
    MockApi::default().router()
}

impl MockApi {
    /// The fake API as a router.
    pub fn router(self) -> Router {
        let store = format!("/v1/store/{TENANT}");

        Router::new()
            .route(
                &store,
                get(|| async {
                    Json(json!({ "data": { "data": {
                        "id": 7,
                        "name": "متجر العسل",
                        "domain": TENANT,
                        "banners": [{ "url": "https://cdn.example/banner.jpg" }],
                        "settings": {
                            "color": "#b45309",
                            "country_id": 1,
                            "description": "أجود أنواع العسل",
                            "pixel": [{ "id": "TT123", "type": "tiktok" }],
                            "social_links": [{ "link": "https://instagram.com/honey", "platform": "instagram" }]
                        }
                    }}}))
                }),
            )
            .route(
                &format!("{store}/categories"),
                get(|State(mock): State<MockApi>| async move {
                    catalog_reply(&mock, || {
                        Json(json!({ "data": [
                            { "id": 1, "name": "عسل", "sort_order": 1 },
                            { "id": 2, "name": "زيوت", "sort_order": 2 },
                            { "id": 3, "name": "مخفي", "is_active": false }
                        ]}))
                        .into_response()
                    })
                    .await
                }),
            )
            .route(
                &format!("{store}/products"),
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    let products: Vec<Value> = [1, 2]
                        .into_iter()
                        .filter_map(product)
                        .filter(|p| {
                            query.get("search").is_none_or(|term| {
                                p["name"].as_str().is_some_and(|name| name.contains(term.as_str()))
                            })
                        })
                        .collect();
                    Json(json!({ "data": products }))
                }),
            )
            .route(
                &format!("{store}/products/{{id}}"),
                get(|State(mock): State<MockApi>, Path(id): Path<i64>| async move {
                    catalog_reply(&mock, || match product(id) {
                        Some(p) => Json(json!({ "data": p })).into_response(),
                        None => StatusCode::NOT_FOUND.into_response(),
                    })
                    .await
                }),
            )
            .route(
                &format!("{store}/payment-methods"),
                get(|| async {
                    Json(json!({ "data": [
                        { "id": 1, "name": "الدفع عند الاستلام" },
                        { "id": 4, "name": "محفظة", "is_active": false }
                    ]}))
                }),
            )
            .route(&format!("{store}/checkout"), post(checkout_reply))
            .route(
                "/v1/utilities/countries",
                get(|| async {
                    Json(json!({ "data": [
                        { "id": 1, "name": "السعودية", "code": "SA",
                          "currency": { "id": 1, "currency": "SAR", "rate_to_usd": "3.75" } },
                        { "id": 2, "name": "مصر", "code": "EG",
                          "currency": { "id": 2, "currency": "EGP", "rate_to_usd": "48.50" } }
                    ]}))
                }),
            )
            .route(
                "/v1/utilities/countries/{id}/cities",
                get(|Path(id): Path<i64>| async move {
                    let cities = match id {
                        1 => json!([{ "id": 10, "name": "الرياض" }, { "id": 11, "name": "جدة" }]),
                        _ => json!([{ "id": 20, "name": "القاهرة" }]),
                    };
                    Json(json!({ "data": cities }))
                }),
            )
            .with_state(self)
    }
}

/// Storefront configuration pointing at `api_base`.
pub fn test_config(api_base: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/souq_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        api: ApiConfig::new(api_base, TENANT).unwrap(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The full storefront over an always-available fake API, with in-memory
/// sessions, and the API's order submission count.
pub async fn test_app() -> (Router, Arc<AtomicUsize>) {
    let mock = MockApi::default();
    let orders = Arc::clone(&mock.orders);
    (test_app_with(mock).await, orders)
}

/// The full storefront over the given fake API.
///
/// The database pool is lazy and never used outside readiness checks.
pub async fn test_app_with(mock: MockApi) -> Router {
    let base = spawn(mock.router()).await;
    let mut config = test_config(&base);
    config.api.timeout = TEST_TIMEOUT;
    let pool = PgPool::connect_lazy("postgres://localhost/souq_test").unwrap();
    let state = AppState::new(config, pool).unwrap();
    crate::app(state, session_layer(MemoryStore::default(), false))
}
