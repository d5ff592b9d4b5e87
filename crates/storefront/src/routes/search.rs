//! Search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer};
use souq_core::CategoryId;
use tracing::instrument;

use crate::api::{Category, Loadable, ProductFilter};
use crate::filters;
use crate::state::AppState;
use crate::views::{Layout, PageContext, ProductCard};

/// Deserialize empty strings as None for the optional category select.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<CategoryId>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Search page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category_id: Option<CategoryId>,
}

/// Search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub layout: Layout,
    pub query: String,
    pub category_id: Option<CategoryId>,
    pub categories: Vec<Category>,
    pub products: Vec<ProductCard>,
    pub searched: bool,
    pub error: Option<String>,
}

impl SearchTemplate {
    /// Whether `id` is the selected category filter.
    #[must_use]
    pub fn is_selected(&self, id: CategoryId) -> bool {
        self.category_id == Some(id)
    }
}

/// Search products by text and category.
///
/// Without a query or category the page shows only the form.
#[instrument(skip(state, page))]
pub async fn search(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let filter = ProductFilter {
        category_id: query.category_id,
        search: Some(query.q.trim().to_string()).filter(|q| !q.is_empty()),
    };
    let searched = filter.search.is_some() || filter.category_id.is_some();

    let categories = match state.api().categories().await {
        Ok(categories) => Category::active_sorted(&categories),
        Err(e) => {
            tracing::warn!(error = %e, "Search page without category filter");
            Vec::new()
        }
    };

    let (products, error) = if searched {
        Loadable::from_result(state.api().products(&filter).await, "search").into_parts()
    } else {
        (Vec::new(), None)
    };

    SearchTemplate {
        layout: page.layout("البحث", &[]),
        query: query.q,
        category_id: query.category_id,
        categories,
        products: page.cards(&products),
        searched,
        error,
    }
}
