//! Cart route handlers.
//!
//! The cart lives in the session (`cart-storage`). Mutations answer htmx
//! requests with fragments and plain form posts with a redirect, so the
//! pages work without JavaScript.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use souq_core::{Cart, ProductId};
use tracing::instrument;

use crate::api::Loadable;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::services::pixels::PixelEvent;
use crate::state::AppState;
use crate::stores::Persistent;
use crate::views::{CartSummary, Layout, PageContext};

/// htmx event other elements listen to for cart changes.
const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

const fn one() -> u32 {
    1
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page query: `added` is set after a non-htmx add, to fire the pixel.
#[derive(Debug, Default, Deserialize)]
pub struct CartQuery {
    pub added: Option<ProductId>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartSummary,
    pub error: Option<String>,
}

/// Cart items fragment template (for htmx).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartSummary,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for htmx).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Badge plus the `AddToCart` pixel calls, returned after an htmx add.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_added.html")]
pub struct CartAddedTemplate {
    pub count: u32,
    pub nonce: String,
    pub pixel_script: String,
}

/// Price the cart's products through the API.
async fn summarize(state: &AppState, page: &PageContext) -> (CartSummary, Option<String>) {
    let ids: Vec<ProductId> = page.cart.items().iter().map(|i| i.product_id).collect();
    if ids.is_empty() {
        return (page.cart_summary(&[]), None);
    }
    let (products, error) =
        Loadable::from_result(state.api().products_by_id(&ids).await, "cart products")
            .into_parts();
    (page.cart_summary(&products), error)
}

/// Pixel event for adding `quantity` of a product, if its price is known.
async fn add_to_cart_event(
    state: &AppState,
    page: &PageContext,
    product_id: ProductId,
    quantity: u32,
) -> Option<PixelEvent> {
    match state.api().product(product_id).await {
        Ok(product) => product.price_for(quantity).map(|tier| {
            PixelEvent::AddToCart(page.event_params(&[product_id], tier.total_for(quantity)))
        }),
        Err(e) => {
            tracing::debug!(error = %e, %product_id, "No AddToCart event without a price");
            None
        }
    }
}

/// Display cart page.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<CartQuery>,
) -> impl IntoResponse {
    let (cart, error) = summarize(&state, &page).await;

    let mut events = Vec::new();
    if let Some(product_id) = query.added {
        let quantity = page.cart.quantity_of(product_id);
        if quantity > 0 {
            events.extend(add_to_cart_event(&state, &page, product_id, quantity).await);
        }
    }

    CartShowTemplate {
        layout: page.layout("السلة", &events),
        cart,
        error,
    }
}

/// Add item to cart.
///
/// htmx gets the new badge (plus pixel calls) and a `cart-updated` trigger;
/// form posts are redirected to the cart page.
#[instrument(skip(state, page, cart))]
pub async fn add(
    State(state): State<AppState>,
    mut page: PageContext,
    mut cart: Persistent<Cart>,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    cart.update(|cart| cart.add_to_cart(form.product_id, form.quantity))
        .await?;
    page.cart = cart.get().clone();

    let product_id = form.product_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

    if !page.htmx {
        return Ok(Redirect::to(&format!("/cart?added={product_id}")).into_response());
    }

    let events: Vec<PixelEvent> =
        add_to_cart_event(&state, &page, form.product_id, form.quantity.max(1))
            .await
            .into_iter()
            .collect();

    Ok((
        AppendHeaders([CART_UPDATED]),
        CartAddedTemplate {
            count: page.cart.item_count(),
            nonce: page.nonce.value().to_string(),
            pixel_script: page.fragment_pixel_script(&events),
        },
    )
        .into_response())
}

/// Update cart item quantity. Zero removes the item.
#[instrument(skip(state, page, cart))]
pub async fn update(
    State(state): State<AppState>,
    mut page: PageContext,
    mut cart: Persistent<Cart>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let updated = cart
        .update(|cart| cart.update_quantity(form.product_id, form.quantity))
        .await?;
    if !updated {
        tracing::debug!(product_id = %form.product_id, "Quantity update for item not in cart");
    }
    page.cart = cart.get().clone();

    items_response(&state, &page).await
}

/// Remove item from cart.
#[instrument(skip(state, page, cart))]
pub async fn remove(
    State(state): State<AppState>,
    mut page: PageContext,
    mut cart: Persistent<Cart>,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    cart.update(|cart| cart.remove_from_cart(form.product_id))
        .await?;
    page.cart = cart.get().clone();

    items_response(&state, &page).await
}

/// Cart items fragment for htmx, redirect to the cart otherwise.
async fn items_response(state: &AppState, page: &PageContext) -> Result<Response> {
    if !page.htmx {
        return Ok(Redirect::to("/cart").into_response());
    }
    let (cart, error) = summarize(state, page).await;
    Ok((AppendHeaders([CART_UPDATED]), CartItemsTemplate { cart, error }).into_response())
}

/// Get cart count badge (htmx).
#[instrument(skip(cart))]
pub async fn count(cart: Persistent<Cart>) -> impl IntoResponse {
    CartCountTemplate {
        count: cart.item_count(),
    }
}
