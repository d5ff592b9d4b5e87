//! Store API smoke check.
//!
//! Fetches what every page needs for the configured tenant and logs a
//! summary, so a deployment can be checked before traffic arrives.
//!
//! # Environment Variables
//!
//! - `SOUQ_API_BASE_URL` - Store API root
//! - `SOUQ_STORE_TENANT` - Tenant to check (overridden by `--tenant`)
//! - `SOUQ_API_TIMEOUT_SECS` - Per-request timeout (default: 10)

use souq_storefront::api::{ApiClient, ApiError, Category};
use souq_storefront::config::{ApiConfig, ConfigError};
use souq_storefront::services::currency::resolve_currency;
use thiserror::Error;

/// Check failures.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store API error: {0}")]
    Api(#[from] ApiError),
}

/// Run the check.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the store settings
/// cannot be fetched. Categories and countries failing only log warnings.
pub async fn run(tenant: Option<&str>) -> Result<(), CheckError> {
    dotenvy::dotenv().ok();

    let mut config = ApiConfig::from_env()?;
    if let Some(tenant) = tenant {
        // Validated the same way as the environment value
        config.tenant = ApiConfig::new(config.base_url.as_str(), tenant)?.tenant;
    }
    let client = ApiClient::new(&config)?;

    let store = client.store_data().await?;
    tracing::info!(
        tenant = client.tenant(),
        store = %store.name,
        active = store.is_active,
        banners = store.banners.len(),
        pixels = store.settings.pixels.len(),
        "Store settings"
    );

    match client.categories().await {
        Ok(categories) => tracing::info!(
            total = categories.len(),
            active = Category::active_sorted(&categories).len(),
            "Categories"
        ),
        Err(e) => tracing::warn!(error = %e, "Categories unavailable"),
    }

    match client.countries().await {
        Ok(countries) => {
            let currency = resolve_currency(&countries, store.settings.country_id.as_deref());
            match currency {
                Some(currency) => tracing::info!(
                    countries = countries.len(),
                    currency = %currency.code,
                    rate_to_usd = %currency.rate_to_usd,
                    "Display currency resolved"
                ),
                None => tracing::warn!(
                    countries = countries.len(),
                    country_id = ?store.settings.country_id,
                    "No currency for the store's country, prices will show in USD"
                ),
            }
        }
        Err(e) => tracing::warn!(error = %e, "Countries unavailable"),
    }

    let methods = client.payment_methods().await;
    tracing::info!(count = methods.len(), "Payment methods");

    Ok(())
}
