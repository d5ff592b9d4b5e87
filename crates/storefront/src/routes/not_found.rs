//! Fallback pages: unknown paths and store data that could not be loaded.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::filters;
use crate::views::{Layout, PageContext};

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

/// Page shell with a message, for when the store API failed.
#[derive(Template, WebTemplate)]
#[template(path = "errors/unavailable.html")]
pub struct UnavailableTemplate {
    pub layout: Layout,
    pub message: String,
}

/// The not-found page with a 404 status.
pub fn not_found_page(page: &PageContext) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            layout: page.layout("الصفحة غير موجودة", &[]),
        },
    )
        .into_response()
}

/// The page shell with `message` in place of content. Status stays 200.
pub fn unavailable_page(page: &PageContext, title: &str, message: String) -> Response {
    UnavailableTemplate {
        layout: page.layout(title, &[]),
        message,
    }
    .into_response()
}

/// Render the not-found page for unknown paths.
pub async fn not_found(page: PageContext) -> Response {
    not_found_page(&page)
}
