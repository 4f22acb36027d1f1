//! Order domain types.
//!
//! An order is a durable snapshot taken at settlement: its items carry the
//! product name, price, and image as they were at checkout, so later catalog
//! edits or deletions never alter order history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::{CurrencyCode, OrderId, OrderNumber, OrderStatus, UserId};

/// Postal address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// A settled order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Payment-provider session this order settled from. Unique - the
    /// anchor for settlement idempotency.
    pub payment_session_id: String,
    pub status: OrderStatus,
    pub currency: CurrencyCode,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub shipping_address: Option<Address>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// One line of an order's item snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

/// Input for creating an order at settlement time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub payment_session_id: String,
    pub currency: CurrencyCode,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub shipping_address: Option<Address>,
    pub items: Vec<NewOrderItem>,
}

/// One item of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}
