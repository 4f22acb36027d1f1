//! Order persistence seam.
//!
//! Orders are created exactly once per settled payment session; the store
//! enforces that with a uniqueness guarantee over `payment_session_id` and
//! reports a duplicate as [`RepositoryError::Conflict`] so the verifier can
//! resolve concurrent settlement races.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use atelier_core::{OrderId, OrderNumber, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

/// Durable order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create an order (status `pending`), assigning its ID and
    /// human-readable order number.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if an order already exists for
    /// the same payment session, [`RepositoryError::Database`] otherwise.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Find the order settled from the given payment session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the lookup fails.
    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// All orders for a shopper, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the lookup fails.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Materialize a [`NewOrder`] into an [`Order`] with fresh identifiers.
fn materialize(new: NewOrder) -> Order {
    Order {
        id: OrderId::generate(),
        order_number: OrderNumber::generate(),
        user_id: new.user_id,
        payment_session_id: new.payment_session_id,
        status: OrderStatus::Pending,
        currency: new.currency,
        subtotal: new.subtotal,
        shipping_cost: new.shipping_cost,
        total: new.total,
        shipping_address: new.shipping_address,
        items: new
            .items
            .into_iter()
            .map(|item| OrderItem {
                product_name: item.product_name,
                unit_price: item.unit_price,
                quantity: item.quantity,
                image_url: item.image_url,
            })
            .collect(),
        created_at: Utc::now(),
    }
}

/// In-memory order store (for development and tests).
#[derive(Default)]
pub struct MemoryOrderStore {
    by_session: RwLock<HashMap<String, Order>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let mut by_session = self.by_session.write().unwrap();
        if by_session.contains_key(&order.payment_session_id) {
            return Err(RepositoryError::Conflict(
                "order for payment session already exists".to_owned(),
            ));
        }
        let order = materialize(order);
        by_session.insert(order.payment_session_id.clone(), order.clone());
        Ok(order)
    }

    async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let by_session = self.by_session.read().unwrap();
        Ok(by_session.get(session_id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let by_session = self.by_session.read().unwrap();
        let mut orders: Vec<Order> = by_session
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
