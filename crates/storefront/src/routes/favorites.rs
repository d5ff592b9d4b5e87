//! Favorites route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use souq_core::{Favorites, ProductId};
use tracing::instrument;

use crate::api::Loadable;
use crate::error::Result;
use crate::filters;
use crate::state::AppState;
use crate::stores::Persistent;
use crate::views::{Layout, PageContext, ProductCard, referer_path};

/// Toggle favorite form data.
#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteForm {
    pub product_id: ProductId,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/index.html")]
pub struct FavoritesTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    pub error: Option<String>,
}

/// Heart button fragment (for htmx).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

/// Display the favorite products.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let (products, error) = if page.favorites.is_empty() {
        (Vec::new(), None)
    } else {
        Loadable::from_result(
            state.api().products_by_id(page.favorites.ids()).await,
            "favorite products",
        )
        .into_parts()
    };

    FavoritesTemplate {
        layout: page.layout("المفضلة", &[]),
        products: page.cards(&products),
        error,
    }
}

/// Toggle a product in the favorites.
///
/// htmx gets the updated heart button; form posts go back where they came
/// from.
#[instrument(skip(favorites, headers))]
pub async fn toggle(
    mut favorites: Persistent<Favorites>,
    headers: HeaderMap,
    Form(form): Form<ToggleFavoriteForm>,
) -> Result<Response> {
    let is_favorite = favorites
        .update(|favorites| favorites.toggle_favorite(form.product_id))
        .await?;

    if crate::views::is_htmx(&headers) {
        return Ok(FavoriteButtonTemplate {
            product_id: form.product_id,
            is_favorite,
        }
        .into_response());
    }
    Ok(Redirect::to(&referer_path(&headers, "/favorites")).into_response())
}
