//! View models shared by page handlers.
//!
//! `PageContext` gathers what every page needs (store settings, display
//! currency, cart and favorites, CSP nonce, consent) in one extractor. The
//! other types here are template-ready projections of API data with prices
//! already converted and formatted.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::REFERER;
use axum::http::request::Parts;
use rust_decimal::Decimal;
use souq_core::{Cart, Favorites, ProductId};
use url::Url;

use crate::api::{Product, SocialLink, StoreData};
use crate::error::AppError;
use crate::middleware::CspNonce;
use crate::services::currency::{PriceFormatter, store_currency};
use crate::services::pixels::{self, EventParams, PixelEvent};
use crate::state::AppState;
use crate::stores::Persistent;

/// Header htmx sets on its requests.
pub const HX_REQUEST: &str = "hx-request";

const DEFAULT_ACCENT: &str = "#0f766e";
const DEFAULT_STORE_NAME: &str = "المتجر";

/// Whether the request came from htmx and wants a fragment.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .is_some_and(|value| value.as_bytes() == b"true")
}

/// Local path of the page the visitor came from, for redirecting back.
///
/// Only the path and query of `Referer` are used. Leading slashes collapse
/// to one, since `//host` would be a protocol-relative URL.
#[must_use]
pub fn referer_path(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Url::parse(value).ok())
        .map(|url| {
            let path = url.path().trim_start_matches(['/', '\\']);
            match url.query() {
                Some(query) => format!("/{path}?{query}"),
                None => format!("/{path}"),
            }
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// Keep only `#rgb`, `#rrggbb` or `#rrggbbaa`; the value lands in a style
/// attribute.
fn accent_color(color: Option<&str>) -> String {
    color
        .map(str::trim)
        .filter(|c| {
            c.strip_prefix('#').is_some_and(|hex| {
                matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|ch| ch.is_ascii_hexdigit())
            })
        })
        .unwrap_or(DEFAULT_ACCENT)
        .to_string()
}

// =============================================================================
// PageContext
// =============================================================================

/// Per-request context for full pages.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Store settings, or `None` when the API could not provide them.
    pub store: Option<StoreData>,
    pub prices: PriceFormatter,
    pub cart: Cart,
    pub favorites: Favorites,
    pub nonce: CspNonce,
    /// Recorded consent choice; `None` until the visitor picks one.
    pub consent: Option<bool>,
    pub path: String,
    pub htmx: bool,
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let store = match state.api().store_data().await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "Store settings unavailable, rendering defaults");
                None
            }
        };
        let currency = store_currency(state.api(), store.as_ref()).await;
        let cart = Persistent::<Cart>::from_request_parts(parts, state).await?;
        let favorites = Persistent::<Favorites>::from_request_parts(parts, state).await?;
        let Ok(nonce) = CspNonce::from_request_parts(parts, state).await;

        Ok(Self {
            store,
            prices: PriceFormatter::new(currency),
            cart: cart.into_inner(),
            favorites: favorites.into_inner(),
            nonce,
            consent: pixels::consent_choice(&parts.headers),
            path: parts.uri.path().to_string(),
            htmx: is_htmx(&parts.headers),
        })
    }
}

impl PageContext {
    /// Display name of the store.
    #[must_use]
    pub fn store_name(&self) -> String {
        self.store
            .as_ref()
            .map(|store| {
                store
                    .settings
                    .name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| store.name.clone())
            })
            .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string())
    }

    /// Layout data for a page titled `title`, firing `events` after the
    /// page view.
    #[must_use]
    pub fn layout(&self, title: &str, events: &[PixelEvent]) -> Layout {
        let store_name = self.store_name();
        let settings = self.store.as_ref().map(|store| &store.settings);

        let tracking = self.consent.unwrap_or(true);
        let pixel_script = match settings {
            Some(settings) if tracking => {
                let pixels = pixels::pixels_from_settings(&settings.pixels);
                let mut all = vec![PixelEvent::PageView {
                    path: self.path.clone(),
                }];
                all.extend_from_slice(events);
                pixels::render_script(&pixels, &all)
            }
            _ => String::new(),
        };

        Layout {
            title: if title.is_empty() {
                store_name.clone()
            } else {
                format!("{title} | {store_name}")
            },
            description: settings
                .and_then(|s| s.description.clone())
                .unwrap_or_default(),
            accent_color: accent_color(settings.and_then(|s| s.color.as_deref())),
            logo: self.store.as_ref().and_then(|s| s.logo.clone()),
            favicon: self.store.as_ref().and_then(|s| s.favicon.clone()),
            og_image: self
                .store
                .as_ref()
                .and_then(|s| s.banners.first().map(|b| b.url.clone()).or_else(|| s.logo.clone())),
            social_links: settings.map(|s| s.social_links.clone()).unwrap_or_default(),
            cart_count: self.cart.item_count(),
            favorites_count: self.favorites.len(),
            nonce: self.nonce.value().to_string(),
            pixel_script,
            ask_consent: self.consent.is_none(),
            path: self.path.clone(),
            store_name,
        }
    }

    /// Event calls for an htmx fragment, honouring consent.
    #[must_use]
    pub fn fragment_pixel_script(&self, events: &[PixelEvent]) -> String {
        match &self.store {
            Some(store) if self.consent.unwrap_or(true) => pixels::render_events(
                &pixels::pixels_from_settings(&store.settings.pixels),
                events,
            ),
            _ => String::new(),
        }
    }

    /// Pixel parameters for `amount_in_usd` worth of `product_ids`.
    #[must_use]
    pub fn event_params(&self, product_ids: &[ProductId], amount_in_usd: Decimal) -> EventParams {
        EventParams {
            value: self.prices.convert(amount_in_usd),
            currency: self.prices.code().to_string(),
            content_ids: product_ids.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn card(&self, product: &Product) -> ProductCard {
        ProductCard {
            id: product.id,
            name: product.name.clone(),
            image: product.image_url().map(str::to_string),
            price: product
                .base_price()
                .map(|tier| self.prices.format(tier.price_in_usd)),
            in_stock: product.in_stock(),
            is_favorite: self.favorites.is_favorite(product.id),
            in_cart: self.cart.is_in_cart(product.id),
            rating: product.average_rating(),
        }
    }

    #[must_use]
    pub fn cards(&self, products: &[Product]) -> Vec<ProductCard> {
        products.iter().map(|p| self.card(p)).collect()
    }

    /// Price tiers of a product as offer cards, cheapest breakpoint first.
    #[must_use]
    pub fn offers(&self, product: &Product) -> Vec<OfferView> {
        let base = product.base_price();
        product
            .sorted_tiers()
            .into_iter()
            .map(|tier| OfferView {
                min_quantity: tier.min_quantity,
                unit_price: self.prices.format(tier.price_in_usd),
                total: self.prices.format(tier.total_for(tier.min_quantity)),
                savings_percent: base.and_then(|base| tier.savings_percent(base)),
                is_base: base.is_some_and(|base| base.min_quantity == tier.min_quantity),
            })
            .collect()
    }

    /// Cart lines priced with the tier each quantity qualifies for.
    ///
    /// Entries whose product the API no longer returns are counted in
    /// `missing` and left out of the total.
    #[must_use]
    pub fn cart_summary(&self, products: &[Product]) -> CartSummary {
        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let mut lines = Vec::new();
        let mut missing = 0;
        let mut total_in_usd = Decimal::ZERO;

        for item in self.cart.items() {
            let Some(product) = by_id.get(&item.product_id) else {
                missing += 1;
                continue;
            };
            let Some(tier) = product.price_for(item.quantity) else {
                missing += 1;
                continue;
            };
            let line_total = tier.total_for(item.quantity);
            total_in_usd += line_total;

            lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                image: product.image_url().map(str::to_string),
                quantity: item.quantity,
                unit_price: self.prices.format(tier.price_in_usd),
                line_total: self.prices.format(line_total),
                savings_percent: product
                    .base_price()
                    .and_then(|base| tier.savings_percent(base)),
            });
        }

        CartSummary {
            item_count: self.cart.item_count(),
            total: self.prices.format(total_in_usd),
            total_in_usd,
            lines,
            missing,
        }
    }
}

// =============================================================================
// View types
// =============================================================================

/// Everything `base.html` renders.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    pub store_name: String,
    pub description: String,
    pub accent_color: String,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub og_image: Option<String>,
    pub social_links: Vec<SocialLink>,
    pub cart_count: u32,
    pub favorites_count: usize,
    pub nonce: String,
    /// Inline pixel script; empty when tracking is off or unconfigured.
    pub pixel_script: String,
    /// Show the consent banner.
    pub ask_consent: bool,
    pub path: String,
}

/// A product on a listing.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    /// Formatted base price; `None` for products without tiers.
    pub price: Option<String>,
    pub in_stock: bool,
    pub is_favorite: bool,
    pub in_cart: bool,
    pub rating: Option<f32>,
}

/// One price tier on the product page.
#[derive(Debug, Clone)]
pub struct OfferView {
    pub min_quantity: u32,
    pub unit_price: String,
    /// Price of buying exactly `min_quantity` units.
    pub total: String,
    pub savings_percent: Option<u32>,
    pub is_base: bool,
}

/// One cart entry, priced.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub savings_percent: Option<u32>,
}

/// The priced cart.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub total: String,
    pub total_in_usd: Decimal,
    pub missing: usize,
}

impl CartSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
