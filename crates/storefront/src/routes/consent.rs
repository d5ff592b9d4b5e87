//! Tracking consent handler.

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use crate::services::pixels::consent_cookie;
use crate::state::AppState;
use crate::views::referer_path;

/// Consent form data: `allowed` is `"true"` or `"false"`.
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    pub allowed: String,
}

/// Record the visitor's tracking choice and go back.
#[instrument(skip(state, headers))]
pub async fn set_consent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ConsentForm>,
) -> impl IntoResponse {
    let allowed = form.allowed.trim() == "true";
    let cookie = consent_cookie(allowed, state.config().is_secure());

    (
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Redirect::to(&referer_path(&headers, "/")),
    )
}
