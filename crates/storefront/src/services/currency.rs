//! Display currency resolution.
//!
//! The API quotes prices in USD. The store's settings name a country, and
//! that country's currency (with its rate to USD) is what visitors see.

use rust_decimal::Decimal;
use souq_core::{Currency, format_amount};

use crate::api::{ApiClient, Country, StoreData};

/// Find the currency of the store's configured country.
///
/// IDs are compared as strings because store settings carry the country ID
/// as text. Returns `None` when the ID is missing, no country matches, or
/// the matching country's currency is unusable.
#[must_use]
pub fn resolve_currency(countries: &[Country], store_country_id: Option<&str>) -> Option<Currency> {
    let wanted = store_country_id.map(str::trim).filter(|id| !id.is_empty())?;
    let country = countries.iter().find(|c| c.id.to_string() == wanted)?;
    let currency = country.currency.as_ref()?;

    match Currency::new(currency.currency.clone(), currency.rate_to_usd) {
        Ok(currency) => Some(currency),
        Err(e) => {
            tracing::warn!(country_id = %country.id, error = %e, "Ignoring unusable currency");
            None
        }
    }
}

/// Resolve the store currency through the (cached) API.
///
/// Failures fall back to USD display and are only logged.
pub async fn store_currency(api: &ApiClient, store: Option<&StoreData>) -> Option<Currency> {
    let country_id = store?.settings.country_id.as_deref()?;
    match api.countries().await {
        Ok(countries) => resolve_currency(&countries, Some(country_id)),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load countries, showing USD prices");
            None
        }
    }
}

/// Formats USD amounts in the visitor's currency.
#[derive(Debug, Clone, Default)]
pub struct PriceFormatter {
    currency: Option<Currency>,
}

impl PriceFormatter {
    #[must_use]
    pub const fn new(currency: Option<Currency>) -> Self {
        Self { currency }
    }

    /// `"37.50 SAR"`, or `"$10.00"` without a currency.
    #[must_use]
    pub fn format(&self, amount_in_usd: Decimal) -> String {
        format_amount(amount_in_usd, self.currency.as_ref())
    }

    /// Amount in the display currency, for pixel event values.
    #[must_use]
    pub fn convert(&self, amount_in_usd: Decimal) -> Decimal {
        self.currency
            .as_ref()
            .map_or(amount_in_usd, |c| c.convert(amount_in_usd))
    }

    /// Currency code for pixel events.
    #[must_use]
    pub fn code(&self) -> &str {
        self.currency.as_ref().map_or("USD", |c| c.code.as_str())
    }

    #[must_use]
    pub const fn currency(&self) -> Option<&Currency> {
        self.currency.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn countries() -> Vec<Country> {
        serde_json::from_value(json!([
            { "id": 1, "name": "السعودية", "code": "SA",
              "currency": { "id": 1, "currency": "SAR", "rate_to_usd": "3.75" } },
            { "id": 2, "name": "مصر", "code": "EG",
              "currency": { "id": 2, "currency": "EGP", "rate_to_usd": "48.5" } },
            { "id": 3, "name": "بلا عملة" }
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolves_by_string_id() {
        let currency = resolve_currency(&countries(), Some("1")).unwrap();
        assert_eq!(currency.code, "SAR");
        assert_eq!(currency.rate_to_usd, "3.75".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_missing_inputs_fall_back() {
        assert!(resolve_currency(&countries(), None).is_none());
        assert!(resolve_currency(&countries(), Some("")).is_none());
        assert!(resolve_currency(&countries(), Some("99")).is_none());
        assert!(resolve_currency(&countries(), Some("3")).is_none());
        assert!(resolve_currency(&[], Some("1")).is_none());
    }

    #[test]
    fn test_formatter() {
        let sar = PriceFormatter::new(resolve_currency(&countries(), Some("1")));
        assert_eq!(sar.format("10.00".parse().unwrap()), "37.50 SAR");
        assert_eq!(sar.code(), "SAR");

        let usd = PriceFormatter::default();
        assert_eq!(usd.format("10".parse().unwrap()), "$10.00");
        assert_eq!(usd.code(), "USD");
    }
}
