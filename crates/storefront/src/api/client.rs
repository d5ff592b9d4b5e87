//! Store API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP with a per-client timeout. Caches store
//! data, categories, countries and products using `moka`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use souq_core::checkout::CheckoutRequest;
use souq_core::{CountryId, ProductId};

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, CheckoutResponse, City, Country, Envelope, PaymentMethod, Product, ProductFilter,
    StoreData, StorePayload,
};
use crate::config::ApiConfig;

/// Longest error body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the store API.
///
/// Cheap to clone; clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    tenant: String,
    timeout: Duration,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new store API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("souq-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                tenant: config.tenant.clone(),
                timeout: config.timeout,
                cache,
            }),
        })
    }

    /// Tenant this client serves.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.inner.tenant
    }

    /// Build `{base}/v1/store/{tenant}{suffix}`.
    fn store_url(&self, suffix: &str) -> Result<Url, ApiError> {
        Ok(self
            .inner
            .base_url
            .join(&format!("v1/store/{}{suffix}", self.inner.tenant))?)
    }

    /// Build `{base}/v1/utilities/{suffix}`.
    fn utilities_url(&self, suffix: &str) -> Result<Url, ApiError> {
        Ok(self
            .inner
            .base_url
            .join(&format!("v1/utilities/{suffix}"))?)
    }

    fn classify(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.inner.timeout)
        } else {
            ApiError::Network(error)
        }
    }

    /// Send a request and unwrap the `data` envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(what.to_string()));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                what,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Store API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => Ok(envelope.data),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    what,
                    body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                    "Failed to parse store API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, ApiError> {
        let request = self.inner.client.get(url);
        self.execute(request, what).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.post(url).json(body);
        self.execute(request, what).await
    }

    // =========================================================================
    // Store
    // =========================================================================

    /// Get the store's settings and branding.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(tenant = %self.inner.tenant))]
    pub async fn store_data(&self) -> Result<StoreData, ApiError> {
        if let Some(CacheValue::Store(store)) = self.inner.cache.get(&CacheKey::Store).await {
            debug!("Cache hit for store data");
            return Ok(*store);
        }

        let url = self.store_url("")?;
        let payload: StorePayload = self.get(url, "store").await?;
        let store = payload.into_inner();

        self.inner
            .cache
            .insert(CacheKey::Store, CacheValue::Store(Box::new(store.clone())))
            .await;

        Ok(store)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List all categories, as returned by the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.store_url("/categories")?;
        let categories: Vec<Category> = self.get(url, "categories").await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Find a category by ID among the listed categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no category has this ID.
    pub async fn category(&self, id: souq_core::CategoryId) -> Result<Category, ApiError> {
        self.categories()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("category {id}")))
    }

    /// List products, optionally filtered by category and search term.
    ///
    /// Unfiltered and category-only listings are cached; searches are not.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = ?filter.category_id, search = ?filter.search_term()))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        let search = filter.search_term();
        let cache_key = CacheKey::Products {
            category_id: filter.category_id,
        };

        if search.is_none()
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.store_url("/products")?;
        if filter.category_id.is_some() || search.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(category_id) = filter.category_id {
                query.append_pair("category_id", &category_id.to_string());
            }
            if let Some(search) = search {
                query.append_pair("search", search);
            }
        }

        let products: Vec<Product> = self.get(url, "products").await?;

        if search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.store_url(&format!("/products/{id}"))?;
        let product: Product = self.get(url, &format!("product {id}")).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Fetch several products, skipping ones that no longer exist.
    ///
    /// Used to render the cart and favorites, which only hold IDs.
    ///
    /// # Errors
    ///
    /// Returns the first error other than not-found.
    pub async fn products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.product(*id).await {
                Ok(product) => products.push(product),
                Err(ApiError::NotFound(_)) => {
                    tracing::info!(product_id = %id, "Skipping product that no longer exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(products)
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// List countries with their currencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        if let Some(CacheValue::Countries(countries)) =
            self.inner.cache.get(&CacheKey::Countries).await
        {
            debug!("Cache hit for countries");
            return Ok(countries);
        }

        let url = self.utilities_url("countries")?;
        let countries: Vec<Country> = self.get(url, "countries").await?;

        self.inner
            .cache
            .insert(CacheKey::Countries, CacheValue::Countries(countries.clone()))
            .await;

        Ok(countries)
    }

    /// List the cities of a country.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(country_id = %country_id))]
    pub async fn cities(&self, country_id: CountryId) -> Result<Vec<City>, ApiError> {
        let url = self.utilities_url(&format!("countries/{country_id}/cities"))?;
        self.get(url, "cities").await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Active payment methods, or the built-in methods if the API has none
    /// or cannot be reached.
    #[instrument(skip(self))]
    pub async fn payment_methods(&self) -> Vec<PaymentMethod> {
        let fetched: Result<Vec<PaymentMethod>, ApiError> = match self.store_url("/payment-methods")
        {
            Ok(url) => self.get(url, "payment methods").await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(methods) => {
                let active: Vec<PaymentMethod> =
                    methods.into_iter().filter(|m| m.is_active).collect();
                if active.is_empty() {
                    PaymentMethod::fallback()
                } else {
                    active
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Using built-in payment methods");
                PaymentMethod::fallback()
            }
        }
    }

    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the order or the request fails.
    #[instrument(skip(self, request), fields(items = request.items.len(), payment_method_id = %request.payment_method_id))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutResponse, ApiError> {
        let url = self.store_url("/checkout")?;
        self.post(url, request, "checkout").await
    }
}

/// Pull `message` out of an error body like `{"message": "..."}`.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use souq_core::ErrorKind;

    use super::*;
    use crate::test_support::{mock_api, spawn};

    fn client_for(base: &str, timeout: Duration) -> ApiClient {
        let mut config = ApiConfig::new(base, "shop.example").unwrap();
        config.timeout = timeout;
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let slow = Router::new().route(
            "/v1/store/shop.example/products",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "data": [] }))
            }),
        );
        let base = spawn(slow).await;
        let client = client_for(&base, Duration::from_millis(200));

        let err = client
            .products(&ProductFilter::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout(_)), "got {err:?}");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_unwraps_envelope_and_caches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/v1/store/shop.example/categories",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "data": [{ "id": 1, "name": "عطور" }] }))
                }),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn(app).await;
        let client = client_for(&base, Duration::from_secs(5));

        let first = client.categories().await.unwrap();
        let second = client.categories().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second[0].name, "عطور");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_sends_query_and_skips_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/v1/store/shop.example/products",
                get(
                    |State(hits): State<Arc<AtomicUsize>>,
                     Query(query): Query<std::collections::HashMap<String, String>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let name = query.get("search").cloned().unwrap_or_default();
                        Json(json!({ "data": [{ "id": 1, "name": name }] }))
                    },
                ),
            )
            .with_state(Arc::clone(&hits));
        let base = spawn(app).await;
        let client = client_for(&base, Duration::from_secs(5));

        let filter = ProductFilter {
            category_id: None,
            search: Some(" عسل ".to_string()),
        };
        let products = client.products(&filter).await.unwrap();
        client.products(&filter).await.unwrap();

        assert_eq!(products[0].name, "عسل");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_status_errors() {
        let app = Router::new()
            .route(
                "/v1/store/shop.example/categories",
                get(|| async {
                    (
                        axum::http::StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "message": "maintenance" })),
                    )
                }),
            );
        let base = spawn(app).await;
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.categories().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status {
                status: 503,
                message: Some(_)
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Network);

        let err = client.product(ProductId::new(404)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_payment_methods_fall_back() {
        let base = spawn(Router::new()).await;
        let client = client_for(&base, Duration::from_secs(5));

        let methods = client.payment_methods().await;
        assert_eq!(methods, PaymentMethod::fallback());
    }

    #[tokio::test]
    async fn test_mock_api_store_and_countries() {
        let base = spawn(mock_api()).await;
        let client = client_for(&base, Duration::from_secs(5));

        let store = client.store_data().await.unwrap();
        assert_eq!(store.settings.country_id.as_deref(), Some("1"));

        let countries = client.countries().await.unwrap();
        assert!(countries.iter().any(|c| c.id == CountryId::new(1)));

        let cities = client.cities(CountryId::new(1)).await.unwrap();
        assert!(!cities.is_empty());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":" نفدت الكمية "}"#).as_deref(),
            Some("نفدت الكمية")
        );
        assert_eq!(error_message("<html>"), None);
    }
}
