//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::api::{Banner, Category, Loadable, ProductFilter};
use crate::filters;
use crate::state::AppState;
use crate::views::{Layout, PageContext, ProductCard};

/// Categories shown in the home strip.
const HOME_CATEGORY_LIMIT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub banners: Vec<Banner>,
    pub categories: Vec<Category>,
    pub products: Vec<ProductCard>,
    pub error: Option<String>,
}

/// Display the home page: banners, categories and the product grid.
///
/// Fetch failures render an inline message instead of an error page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let api = state.api();
    let filter = ProductFilter::default();
    let (categories, products) = tokio::join!(api.categories(), api.products(&filter));

    let (categories, category_error) =
        Loadable::from_result(categories, "categories").into_parts();
    let (products, product_error) = Loadable::from_result(products, "products").into_parts();

    let mut categories = Category::active_sorted(&categories);
    categories.truncate(HOME_CATEGORY_LIMIT);

    HomeTemplate {
        layout: page.layout("", &[]),
        banners: page
            .store
            .as_ref()
            .map(|store| store.banners.clone())
            .unwrap_or_default(),
        categories,
        products: page.cards(&products),
        error: product_error.or(category_error),
    }
}
