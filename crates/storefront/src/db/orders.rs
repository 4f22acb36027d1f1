//! Postgres-backed order store.
//!
//! The `orders.payment_session_id` UNIQUE constraint is the settlement
//! idempotency anchor: concurrent verifications of the same session race to
//! insert, the loser gets a conflict, and the verifier resolves it by
//! re-reading the winner's order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{CurrencyCode, OrderId, OrderNumber, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{Address, NewOrder, Order, OrderItem};
use crate::orders::OrderStore;

/// Orders and their item snapshots in `orders` / `order_item`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT product_name, unit_price, quantity, image_url
            FROM order_item
            WHERE order_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    payment_session_id: String,
    status: String,
    currency: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    shipping_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self.status.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;
        let currency = CurrencyCode::parse(&self.currency).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "invalid currency in database: {}",
                self.currency
            ))
        })?;
        let shipping_address: Option<Address> = match self.shipping_address {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid shipping address: {e}"))
            })?),
            None => None,
        };

        Ok(Order {
            id: OrderId::new(self.id),
            order_number: OrderNumber::from_string(self.order_number),
            user_id: UserId::new(self.user_id),
            payment_session_id: self.payment_session_id,
            status,
            currency,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            total: self.total,
            shipping_address,
            items,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    image_url: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: u32::try_from(row.quantity).unwrap_or(1),
            image_url: row.image_url,
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let order_id = OrderId::generate();
        let order_number = OrderNumber::generate();
        let shipping_address = order
            .shipping_address
            .as_ref()
            .and_then(|address| serde_json::to_string(address).ok());

        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO orders
                (id, order_number, user_id, payment_session_id, status,
                 currency, subtotal, shipping_cost, total, shipping_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, order_number, user_id, payment_session_id, status,
                      currency, subtotal, shipping_cost, total,
                      shipping_address, created_at
            ",
        )
        .bind(order_id.as_uuid())
        .bind(order_number.as_str())
        .bind(order.user_id.as_uuid())
        .bind(&order.payment_session_id)
        .bind(OrderStatus::Pending.to_string())
        .bind(order.currency.code())
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.total)
        .bind(shipping_address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order for payment session"))?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO order_item
                    (order_id, position, product_name, unit_price, quantity, image_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id.as_uuid())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(&item.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let items = order
            .items
            .into_iter()
            .map(|item| OrderItem {
                product_name: item.product_name,
                unit_price: item.unit_price,
                quantity: item.quantity,
                image_url: item.image_url,
            })
            .collect();

        row.into_order(items)
    }

    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, order_number, user_id, payment_session_id, status,
                   currency, subtotal, shipping_cost, total,
                   shipping_address, created_at
            FROM orders
            WHERE payment_session_id = $1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items_for_order(row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, order_number, user_id, payment_session_id, status,
                   currency, subtotal, shipping_cost, total,
                   shipping_address, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.items_for_order(row.id).await?;
            orders.push(row.into_order(items)?);
        }
        Ok(orders)
    }
}
