//! Category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use souq_core::{CategoryId, ErrorKind};
use tracing::instrument;

use crate::api::{Category, Loadable, ProductFilter};
use crate::filters;
use crate::routes::not_found::{not_found_page, unavailable_page};
use crate::state::AppState;
use crate::views::{Layout, PageContext, ProductCard};

/// Category listing template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub layout: Layout,
    pub categories: Vec<Category>,
    pub error: Option<String>,
}

/// Category detail template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub layout: Layout,
    pub category: Category,
    pub products: Vec<ProductCard>,
    pub error: Option<String>,
}

/// Display active categories, ordered by `sort_order`.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let (categories, error) =
        Loadable::from_result(state.api().categories().await, "categories").into_parts();

    CategoriesIndexTemplate {
        layout: page.layout("الأقسام", &[]),
        categories: Category::active_sorted(&categories),
        error,
    }
}

/// Display one category with its products.
///
/// An unknown category renders the not-found page. Failed fetches render
/// the page shell, or the category with an inline message.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<CategoryId>,
) -> Response {
    let category = match Loadable::from_result(state.api().category(id).await, "category") {
        Loadable::Ready(category) => category,
        Loadable::Failed {
            kind: ErrorKind::NotFound,
            ..
        } => return not_found_page(&page),
        Loadable::Failed { message, .. } => return unavailable_page(&page, "الأقسام", message),
    };
    let (products, error) = Loadable::from_result(
        state.api().products(&ProductFilter::category(id)).await,
        "category products",
    )
    .into_parts();

    CategoryShowTemplate {
        layout: page.layout(&category.name, &[]),
        products: page.cards(&products),
        category,
        error,
    }
    .into_response()
}
