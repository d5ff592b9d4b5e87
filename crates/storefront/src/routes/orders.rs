//! Order confirmation route handlers.
//!
//! Only the last order placed in this session is kept. Cancelling changes
//! the session copy; the store API has no cancellation endpoint.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use souq_core::ProductId;
use souq_core::checkout::{OrderConfirmation, OrderStatus};
use tracing::instrument;

use crate::api::Loadable;
use crate::error::Result;
use crate::filters;
use crate::services::pixels::PixelEvent;
use crate::state::AppState;
use crate::stores::Persistent;
use crate::views::{Layout, PageContext};

/// One ordered product.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
}

/// The last order, ready for display.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub reference: String,
    pub status_label: &'static str,
    pub cancelled: bool,
    pub cancellable: bool,
    pub payment_method: String,
    pub customer_name: String,
    pub contact: String,
    pub address: String,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub total: Option<String>,
    pub created_at: String,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub order: Option<OrderView>,
    pub just_placed: bool,
}

fn order_view(page: &PageContext, order: &OrderConfirmation, names: &[(ProductId, String)]) -> OrderView {
    let customer = &order.customer;
    let contact = customer
        .phone
        .as_ref()
        .map(|p| p.international().to_string())
        .or_else(|| customer.email.as_ref().map(|e| e.as_str().to_string()))
        .unwrap_or_default();

    OrderView {
        reference: order.reference.clone(),
        status_label: order.status.label(),
        cancelled: order.status == OrderStatus::Cancelled,
        cancellable: order.is_cancellable(),
        payment_method: order.payment_method_name.clone(),
        customer_name: customer.full_name.clone(),
        contact,
        address: customer.address.clone(),
        notes: customer.notes.clone(),
        lines: order
            .items
            .iter()
            .map(|item| OrderLineView {
                product_id: item.product_id,
                name: names
                    .iter()
                    .find(|(id, _)| *id == item.product_id)
                    .map_or_else(|| format!("#{}", item.product_id), |(_, name)| name.clone()),
                quantity: item.quantity,
            })
            .collect(),
        total: order.total_in_usd.map(|total| page.prices.format(total)),
        created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

/// Display the last order.
///
/// The first view after checkout shows the thank-you notice and fires
/// `Purchase`; reloads do neither.
#[instrument(skip(state, page, last_order))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    mut last_order: Persistent<Option<OrderConfirmation>>,
) -> Result<Response> {
    let just_placed = last_order
        .update(|order| order.as_mut().is_some_and(OrderConfirmation::announce))
        .await?;
    let Some(order) = last_order.get().as_ref() else {
        return Ok(OrdersTemplate {
            layout: page.layout("طلباتي", &[]),
            order: None,
            just_placed: false,
        }
        .into_response());
    };

    let ids: Vec<ProductId> = order.items.iter().map(|i| i.product_id).collect();
    let (products, _) =
        Loadable::from_result(state.api().products_by_id(&ids).await, "order products")
            .into_parts();
    let names: Vec<(ProductId, String)> = products.into_iter().map(|p| (p.id, p.name)).collect();

    let mut events = Vec::new();
    if just_placed {
        if let Some(total) = order.total_in_usd {
            events.push(PixelEvent::Purchase {
                params: page.event_params(&ids, total),
                transaction_id: order.reference.clone(),
            });
        }
    }

    Ok(OrdersTemplate {
        layout: page.layout("طلباتي", &events),
        order: Some(order_view(&page, order, &names)),
        just_placed,
    }
    .into_response())
}

/// Cancel the last order if it is still pending or processing.
#[instrument(skip(last_order))]
pub async fn cancel(mut last_order: Persistent<Option<OrderConfirmation>>) -> Result<Response> {
    let cancelled = last_order
        .update(|order| order.as_mut().is_some_and(OrderConfirmation::cancel))
        .await?;
    if cancelled {
        tracing::info!("Order cancelled by visitor");
    }
    Ok(Redirect::to("/orders").into_response())
}
