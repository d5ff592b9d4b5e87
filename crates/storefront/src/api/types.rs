//! Response types for the store API.
//!
//! Field names follow the API's JSON. Optional and list fields default when
//! absent so a sparse store still renders.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use souq_core::checkout::{CheckoutOutcome, OrderStatus};
use souq_core::{
    CategoryId, CityId, CountryId, OrderId, PaymentMethodId, PriceTier, ProductId, VariantId,
};

/// The `{ "data": ... }` wrapper around every response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// =============================================================================
// Store
// =============================================================================

/// Store settings and branding for the tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub banners: Vec<Banner>,
    #[serde(default)]
    pub settings: StoreSettings,
}

/// Configurable part of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub name: Option<String>,
    /// Accent colour, e.g. `#0f766e`.
    #[serde(default)]
    pub color: Option<String>,
    /// Country whose currency prices are shown in. The API sends it as a
    /// string or a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub country_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "pixel")]
    pub pixels: Vec<PixelConfig>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
}

/// A home page banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A tracking pixel configured for the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelConfig {
    #[serde(deserialize_with = "required_string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A link to the store's social profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLink {
    pub link: String,
    pub platform: String,
}

/// The store endpoint sometimes wraps its payload in a second `data` level.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StorePayload {
    Nested { data: StoreData },
    Flat(StoreData),
}

impl StorePayload {
    pub(crate) fn into_inner(self) -> StoreData {
        match self {
            Self::Nested { data } | Self::Flat(data) => data,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

impl Category {
    /// Active categories ordered by `sort_order`, then name.
    #[must_use]
    pub fn active_sorted(categories: &[Self]) -> Vec<Self> {
        let mut active: Vec<Self> = categories.iter().filter(|c| c.is_active).cloned().collect();
        active.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        active
    }
}

/// A product with its price tiers, media, variants and reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inventory: i64,
    #[serde(default)]
    pub prices: Vec<PriceTier>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// The base tier (lowest minimum quantity).
    #[must_use]
    pub fn base_price(&self) -> Option<&PriceTier> {
        PriceTier::base(&self.prices)
    }

    /// Unit price tier that applies to `quantity`.
    #[must_use]
    pub fn price_for(&self, quantity: u32) -> Option<&PriceTier> {
        PriceTier::for_quantity(&self.prices, quantity)
    }

    /// Tiers sorted by minimum quantity.
    #[must_use]
    pub fn sorted_tiers(&self) -> Vec<&PriceTier> {
        let mut tiers: Vec<&PriceTier> = self.prices.iter().collect();
        tiers.sort_by_key(|tier| tier.min_quantity);
        tiers
    }

    /// First image, used on cards.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.media
            .iter()
            .find(|m| m.is_image())
            .map(|m| m.url.as_str())
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.inventory > 0
    }

    /// Average review rating rounded to one decimal, if any reviews exist.
    #[must_use]
    pub fn average_rating(&self) -> Option<f32> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)] // review counts stay tiny
        let average = total as f32 / self.reviews.len() as f32;
        Some((average * 10.0).round() / 10.0)
    }
}

/// An image or video attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
}

impl Media {
    /// Whether this is an image (missing types are assumed to be images).
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .is_none_or(|t| t.starts_with("image"))
    }
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub options: Vec<VariantOption>,
    #[serde(default)]
    pub inventory: i64,
}

/// One attribute of a variant, e.g. colour = red.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOption {
    pub attribute: String,
    pub value: String,
}

/// A customer review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: i64,
    pub customer_name: String,
    pub rating: u8,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Query parameters for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
}

impl ProductFilter {
    /// Filter by category only.
    #[must_use]
    pub const fn category(category_id: CategoryId) -> Self {
        Self {
            category_id: Some(category_id),
            search: None,
        }
    }

    /// Search term with surrounding whitespace removed, if non-empty.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Geography and payment
// =============================================================================

/// A country with its currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub currency: Option<CountryCurrency>,
}

/// A currency as the countries endpoint describes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryCurrency {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Currency code, e.g. "SAR".
    pub currency: String,
    pub rate_to_usd: Decimal,
}

/// A city within a country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
}

/// A payment method offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PaymentMethod {
    /// Methods offered when the API does not provide any.
    #[must_use]
    pub fn fallback() -> Vec<Self> {
        [
            (1, "الدفع عند الاستلام"),
            (2, "بطاقة الائتمان"),
            (3, "تحويل بنكي"),
        ]
        .into_iter()
        .map(|(id, name)| Self {
            id: PaymentMethodId::new(id),
            name: name.to_string(),
            is_active: true,
        })
        .collect()
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// The API's answer to an order submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub order: Option<PlacedOrder>,
}

/// An order the API created.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl PlacedOrder {
    /// Reference shown to the customer, falling back to the numeric ID.
    #[must_use]
    pub fn display_reference(&self) -> String {
        self.reference
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

impl CheckoutResponse {
    /// Interpret the response for the checkout flow.
    #[must_use]
    pub fn outcome(&self) -> CheckoutOutcome {
        if let Some(url) = self.redirect_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return CheckoutOutcome::Redirect(url.clone());
        }
        match &self.order {
            Some(order) => CheckoutOutcome::Confirmed {
                reference: order.display_reference(),
            },
            None => CheckoutOutcome::Failed("لم يتم إنشاء الطلب، حاول مرة أخرى".to_string()),
        }
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

const fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(StringOrNumber::into_string)
        .filter(|s| !s.trim().is_empty()))
}

fn required_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_store_settings_accept_numeric_country_id() {
        let store: StoreData = serde_json::from_value(json!({
            "id": 1,
            "name": "متجر",
            "settings": { "name": "متجر", "country_id": 3, "pixel": [{ "id": 123, "type": "facebook" }] }
        }))
        .unwrap();
        assert_eq!(store.settings.country_id.as_deref(), Some("3"));
        assert_eq!(store.settings.pixels[0].id, "123");
        assert!(store.is_active);
    }

    #[test]
    fn test_store_payload_nested_and_flat() {
        let nested: StorePayload =
            serde_json::from_value(json!({ "data": { "id": 1, "name": "a" } })).unwrap();
        let flat: StorePayload = serde_json::from_value(json!({ "id": 2, "name": "b" })).unwrap();
        assert_eq!(nested.into_inner().id, 1);
        assert_eq!(flat.into_inner().id, 2);
    }

    #[test]
    fn test_product_prices_and_image() {
        let product: Product = serde_json::from_value(json!({
            "id": 7,
            "name": "عطر",
            "inventory": 4,
            "prices": [
                { "id": 1, "min_quantity": 3, "price_in_usd": "8.00" },
                { "id": 2, "min_quantity": 1, "price_in_usd": "10.00" }
            ],
            "media": [
                { "id": 1, "url": "https://cdn.example/v.mp4", "type": "video/mp4" },
                { "id": 2, "url": "https://cdn.example/p.jpg", "type": "image/jpeg" }
            ]
        }))
        .unwrap();
        assert_eq!(product.base_price().unwrap().min_quantity, 1);
        assert_eq!(product.price_for(5).unwrap().min_quantity, 3);
        assert_eq!(product.image_url(), Some("https://cdn.example/p.jpg"));
        assert!(product.in_stock());
        assert_eq!(product.sorted_tiers()[0].min_quantity, 1);
    }

    #[test]
    fn test_active_categories_sorted() {
        let categories: Vec<Category> = serde_json::from_value(json!([
            { "id": 1, "name": "ب", "sort_order": 2 },
            { "id": 2, "name": "أ", "sort_order": 1 },
            { "id": 3, "name": "ج", "sort_order": 0, "is_active": false }
        ]))
        .unwrap();
        let sorted = Category::active_sorted(&categories);
        let ids: Vec<i64> = sorted.iter().map(|c| c.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_checkout_outcome() {
        let redirect: CheckoutResponse =
            serde_json::from_value(json!({ "redirect_url": "https://pay.example/1" })).unwrap();
        assert_eq!(
            redirect.outcome(),
            CheckoutOutcome::Redirect("https://pay.example/1".to_string())
        );

        let order: CheckoutResponse = serde_json::from_value(json!({
            "order": { "id": 55, "status": "processing", "total": "20.00" }
        }))
        .unwrap();
        assert_eq!(
            order.outcome(),
            CheckoutOutcome::Confirmed {
                reference: "#55".to_string()
            }
        );

        let empty: CheckoutResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(empty.outcome(), CheckoutOutcome::Failed(_)));
    }

    #[test]
    fn test_average_rating() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "x",
            "reviews": [
                { "customer_name": "a", "rating": 5 },
                { "customer_name": "b", "rating": 4 }
            ]
        }))
        .unwrap();
        assert_eq!(product.average_rating(), Some(4.5));
    }
}
