//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use souq_core::{ErrorKind, ProductId};
use tracing::instrument;

use crate::api::{Loadable, Product, Review};
use crate::filters;
use crate::routes::not_found::{not_found_page, unavailable_page};
use crate::services::pixels::PixelEvent;
use crate::state::AppState;
use crate::views::{Layout, OfferView, PageContext};

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: Product,
    pub images: Vec<String>,
    pub price: Option<String>,
    pub offers: Vec<OfferView>,
    pub reviews: Vec<Review>,
    pub rating: Option<f32>,
    pub is_favorite: bool,
    pub quantity_in_cart: u32,
}

/// Display a product with its price tiers, variants and reviews.
///
/// Fires `ViewContent` for the base price. An unknown product renders the
/// not-found page; other fetch failures render the page shell with a message.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Response {
    let product = match Loadable::from_result(state.api().product(id).await, "product") {
        Loadable::Ready(product) => product,
        Loadable::Failed {
            kind: ErrorKind::NotFound,
            ..
        } => return not_found_page(&page),
        Loadable::Failed { message, .. } => return unavailable_page(&page, "المنتج", message),
    };

    let base_price = product.base_price().map(|tier| tier.price_in_usd);
    let events: Vec<PixelEvent> = base_price
        .map(|price| PixelEvent::ViewContent(page.event_params(&[product.id], price)))
        .into_iter()
        .collect();

    let images = product
        .media
        .iter()
        .filter(|m| m.is_image())
        .map(|m| m.url.clone())
        .collect();

    ProductShowTemplate {
        layout: page.layout(&product.name, &events),
        images,
        price: base_price.map(|price| page.prices.format(price)),
        offers: page.offers(&product),
        reviews: product.reviews.clone(),
        rating: product.average_rating(),
        is_favorite: page.favorites.is_favorite(product.id),
        quantity_in_cart: page.cart.quantity_of(product.id),
        product,
    }
    .into_response()
}
