//! Checkout route handlers.
//!
//! The flow state lives in the session (`checkout-flow`):
//!
//! ```text
//! GET  /checkout          details form
//! POST /checkout          validate details -> /checkout/payment
//! GET  /checkout/payment  pick a payment method (shows the last failure)
//! POST /checkout/payment  submit to the store API -> /orders or gateway
//! ```
//!
//! Invalid details never reach the API; the form comes back with a message
//! under each failing field.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use souq_core::checkout::{
    CheckoutError, CheckoutFlow, CheckoutForm, CheckoutOutcome, CheckoutStep, CustomerDetails,
    OrderConfirmation, ValidationErrors,
};
use souq_core::types::phone::DIALING_COUNTRIES;
use souq_core::{Cart, CityId, CountryId, DialingCountry, PaymentMethodId, ProductId};
use tracing::instrument;

use crate::api::{City, Country, Loadable, PaymentMethod};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::state::AppState;
use crate::stores::Persistent;
use crate::views::{CartSummary, Layout, PageContext};

/// Phone country used when the store's country has no dialing entry.
const DEFAULT_PHONE_COUNTRY: &str = "SA";

// =============================================================================
// Templates
// =============================================================================

/// Customer details form.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/details.html")]
pub struct CheckoutDetailsTemplate {
    pub layout: Layout,
    pub form: CheckoutForm,
    pub errors: ValidationErrors,
    pub countries: Vec<Country>,
    pub cities: Vec<City>,
    pub dialing_countries: &'static [DialingCountry],
    pub cart: CartSummary,
    pub error: Option<String>,
}

impl CheckoutDetailsTemplate {
    /// Validation message for the input named `name`.
    #[must_use]
    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(field, _)| field.input_name() == name)
            .map(|(_, message)| message)
    }

    #[must_use]
    pub fn country_selected(&self, id: CountryId) -> bool {
        self.form.country_id.trim() == id.to_string()
    }

    #[must_use]
    pub fn city_selected(&self, id: CityId) -> bool {
        self.form.city_id.trim() == id.to_string()
    }

    #[must_use]
    pub fn dialing_selected(&self, code: &str) -> bool {
        self.form.phone_country.eq_ignore_ascii_case(code)
    }
}

/// City `<select>` fragment (for htmx).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cities.html")]
pub struct CitiesTemplate {
    pub cities: Vec<City>,
    pub error: Option<String>,
}

/// Payment method selection.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub methods: Vec<PaymentMethod>,
    pub selected: Option<PaymentMethodId>,
    pub customer: CustomerDetails,
    pub cart: CartSummary,
    pub error: Option<String>,
}

impl PaymentTemplate {
    #[must_use]
    pub fn is_selected(&self, id: PaymentMethodId) -> bool {
        self.selected == Some(id)
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Cities fragment query.
#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    #[serde(default)]
    pub country_id: String,
}

/// Payment method form data. Empty when nothing was picked.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub payment_method_id: String,
}

// =============================================================================
// Helpers
// =============================================================================

async fn cart_summary(state: &AppState, page: &PageContext) -> CartSummary {
    let ids: Vec<ProductId> = page.cart.items().iter().map(|i| i.product_id).collect();
    let (products, _) =
        Loadable::from_result(state.api().products_by_id(&ids).await, "checkout products")
            .into_parts();
    page.cart_summary(&products)
}

async fn load_cities(state: &AppState, country_id: &str) -> (Vec<City>, Option<String>) {
    match country_id.trim().parse::<CountryId>() {
        Ok(id) => Loadable::from_result(state.api().cities(id).await, "cities").into_parts(),
        Err(_) => (Vec::new(), None),
    }
}

/// Fill empty country selects from the store's own country.
fn prefill_country(form: &mut CheckoutForm, countries: &[Country], page: &PageContext) {
    let store_country = page
        .store
        .as_ref()
        .and_then(|store| store.settings.country_id.as_deref())
        .and_then(|id| countries.iter().find(|c| c.id.to_string() == id.trim()));

    if form.country_id.trim().is_empty() {
        if let Some(country) = store_country {
            form.country_id = country.id.to_string();
        }
    }
    if form.phone_country.trim().is_empty() {
        form.phone_country = store_country
            .and_then(|c| c.code.as_deref())
            .and_then(DialingCountry::by_code)
            .map_or(DEFAULT_PHONE_COUNTRY, |c| c.code)
            .to_string();
    }
}

async fn render_details(
    state: &AppState,
    page: &PageContext,
    mut form: CheckoutForm,
    errors: ValidationErrors,
) -> CheckoutDetailsTemplate {
    let (countries, error) =
        Loadable::from_result(state.api().countries().await, "countries").into_parts();
    prefill_country(&mut form, &countries, page);
    let (cities, _) = load_cities(state, &form.country_id).await;

    CheckoutDetailsTemplate {
        layout: page.layout("إتمام الطلب", &[]),
        cart: cart_summary(state, page).await,
        form,
        errors,
        countries,
        cities,
        dialing_countries: DIALING_COUNTRIES,
        error,
    }
}

async fn render_payment(
    state: &AppState,
    page: &PageContext,
    flow: &CheckoutFlow,
    error: Option<String>,
) -> Option<PaymentTemplate> {
    let customer = flow.details()?.clone();
    Some(PaymentTemplate {
        layout: page.layout("طريقة الدفع", &[]),
        methods: state.api().payment_methods().await,
        selected: flow.payment_method_id(),
        customer,
        cart: cart_summary(state, page).await,
        error,
    })
}

/// Where to send the visitor when the flow refuses a step.
fn redirect_for(error: &CheckoutError) -> Redirect {
    match error {
        CheckoutError::EmptyCart => Redirect::to("/cart"),
        CheckoutError::InvalidStep { .. }
        | CheckoutError::MissingDetails
        | CheckoutError::NoPaymentMethod => Redirect::to("/checkout"),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the customer details form, prefilled from earlier input.
#[instrument(skip(state, page, flow))]
pub async fn show_details(
    State(state): State<AppState>,
    page: PageContext,
    flow: Persistent<CheckoutFlow>,
) -> Response {
    if page.cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }
    let form = flow.details().map(CheckoutForm::from).unwrap_or_default();
    render_details(&state, &page, form, ValidationErrors::default())
        .await
        .into_response()
}

/// Validate the details and move on to payment.
#[instrument(skip(state, page, flow, form))]
pub async fn submit_details(
    State(state): State<AppState>,
    page: PageContext,
    mut flow: Persistent<CheckoutFlow>,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    if page.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    match flow.update(|flow| flow.submit_details(&form)).await? {
        Ok(()) => Ok(Redirect::to("/checkout/payment").into_response()),
        Err(errors) => {
            tracing::info!(fields = errors.len(), "Checkout details rejected");
            let page = render_details(&state, &page, form, errors).await;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

/// Cities of a country as a `<select>` fragment.
#[instrument(skip(state))]
pub async fn cities(
    State(state): State<AppState>,
    Query(query): Query<CitiesQuery>,
) -> impl IntoResponse {
    let (cities, error) = load_cities(&state, &query.country_id).await;
    CitiesTemplate { cities, error }
}

/// Display payment methods.
///
/// A failed submission is shown here once, and the flow returns to method
/// selection.
#[instrument(skip(state, page, flow))]
pub async fn show_payment(
    State(state): State<AppState>,
    page: PageContext,
    mut flow: Persistent<CheckoutFlow>,
) -> Result<Response> {
    if page.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let step = flow.step().clone();
    let error = match step {
        CheckoutStep::Failure { .. } => flow.update(CheckoutFlow::retry).await?,
        CheckoutStep::Submitting => {
            tracing::warn!("Recovering checkout left mid-submission");
            flow.update(CheckoutFlow::abort_submission).await?;
            None
        }
        CheckoutStep::SelectingPayment => None,
        CheckoutStep::FillingDetails
        | CheckoutStep::Success { .. }
        | CheckoutStep::Redirect { .. } => {
            return Ok(Redirect::to("/checkout").into_response());
        }
    };

    Ok(match render_payment(&state, &page, &flow, error).await {
        Some(template) => template.into_response(),
        None => Redirect::to("/checkout").into_response(),
    })
}

/// Submit the order to the store API.
///
/// Success clears the cart and stores the confirmation for `/orders`. A
/// gateway redirect does the same before leaving the site. Failures go
/// back to the payment page with the API's message.
#[instrument(skip(state, page, flow, cart, last_order))]
pub async fn submit_order(
    State(state): State<AppState>,
    page: PageContext,
    mut flow: Persistent<CheckoutFlow>,
    mut cart: Persistent<Cart>,
    mut last_order: Persistent<Option<OrderConfirmation>>,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let methods = state.api().payment_methods().await;
    let method = form
        .payment_method_id
        .trim()
        .parse::<PaymentMethodId>()
        .ok()
        .and_then(|id| methods.iter().find(|m| m.id == id).cloned());

    let Some(method) = method else {
        let error = Some(CheckoutError::NoPaymentMethod.user_message().to_string());
        return Ok(match render_payment(&state, &page, &flow, error).await {
            Some(template) => (StatusCode::UNPROCESSABLE_ENTITY, template).into_response(),
            None => Redirect::to("/checkout").into_response(),
        });
    };

    if let Err(e) = flow.update(|flow| flow.select_payment(method.id)).await? {
        tracing::info!(error = %e, "Payment selected out of order");
        return Ok(redirect_for(&e).into_response());
    }

    let request = match flow.update(|flow| flow.begin_submission(cart.get())).await? {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(error = %e, "Checkout submission refused");
            return Ok(redirect_for(&e).into_response());
        }
    };
    let summary = cart_summary(&state, &page).await;

    let response = state.api().checkout(&request).await;
    let (outcome, placed) = match response {
        Ok(response) => (response.outcome(), response.order),
        Err(e) => {
            tracing::warn!(error = %e, "Order submission failed");
            (CheckoutOutcome::Failed(e.user_message()), None)
        }
    };

    if let Err(e) = flow.update(|flow| flow.complete(outcome.clone()).map(|_| ())).await? {
        tracing::error!(error = %e, "Checkout flow lost its submission");
        return Ok(redirect_for(&e).into_response());
    }

    let reference = match &outcome {
        CheckoutOutcome::Failed(message) => {
            tracing::info!(%message, "Order rejected");
            return Ok(Redirect::to("/checkout/payment").into_response());
        }
        CheckoutOutcome::Confirmed { reference } => reference.clone(),
        CheckoutOutcome::Redirect(_) => placed
            .as_ref()
            .map(crate::api::PlacedOrder::display_reference)
            .unwrap_or_default(),
    };

    if let Some(customer) = flow.details().cloned() {
        let confirmation = OrderConfirmation {
            order_id: placed.as_ref().map(|order| order.id),
            reference: reference.clone(),
            status: placed.as_ref().map(|order| order.status).unwrap_or_default(),
            payment_method_id: method.id,
            payment_method_name: method.name.clone(),
            customer,
            items: cart.items().to_vec(),
            total_in_usd: placed
                .as_ref()
                .and_then(|order| order.total)
                .or((summary.missing == 0).then_some(summary.total_in_usd)),
            created_at: Utc::now(),
            announced: false,
        };
        last_order.set(Some(confirmation)).await?;
    }

    cart.update(Cart::clear).await?;
    flow.reset().await?;
    add_breadcrumb("checkout", "Order placed", Some(&[("reference", reference.as_str())]));
    tracing::info!(%reference, payment_method = %method.id, "Order placed");

    Ok(match outcome {
        CheckoutOutcome::Redirect(url) => Redirect::to(&url).into_response(),
        _ => Redirect::to("/orders").into_response(),
    })
}
