//! Order history route handlers.
//!
//! Read-only: orders are created by settlement and progressed by the back
//! office, never through this surface.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use atelier_core::OrderStatus;

use crate::error::Result;
use crate::middleware::RequireShopper;
use crate::models::Order;
use crate::state::AppState;

/// Order summary for the shopper's order history.
#[derive(Serialize)]
pub struct OrderView {
    pub order_number: String,
    pub status: OrderStatus,
    pub currency: String,
    pub subtotal: String,
    pub shipping_cost: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
}

/// One item of an order snapshot.
#[derive(Serialize)]
pub struct OrderItemView {
    pub product_name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.to_string(),
            status: order.status,
            currency: order.currency.code().to_owned(),
            subtotal: format!("{:.2}", order.subtotal),
            shipping_cost: format!("{:.2}", order.shipping_cost),
            total: format!("{:.2}", order.total),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    product_name: item.product_name.clone(),
                    unit_price: format!("{:.2}", item.unit_price),
                    quantity: item.quantity,
                    image_url: item.image_url.clone(),
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

/// The signed-in shopper's orders, newest first.
#[instrument(skip(state, shopper))]
pub async fn list(
    State(state): State<AppState>,
    RequireShopper(shopper): RequireShopper,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.orders().list_for_user(shopper.id).await?;
    Ok(Json(orders.iter().map(OrderView::from).collect()))
}
