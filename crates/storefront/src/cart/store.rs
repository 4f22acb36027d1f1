//! Persisted cart storage seam.
//!
//! The durable source of truth once a shopper is identified. Each mutation
//! is a single server-side write; the store enforces no cross-line
//! invariants - the facade and the reconciliation engine look up a matching
//! `(product_id, variant)` line before inserting. Failures surface as
//! [`RepositoryError`] with no implicit retry.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use atelier_core::{CartLineId, ProductId, UserId, VariantSelection};

use crate::db::RepositoryError;
use crate::models::CartLine;

/// Per-user cart line storage.
#[async_trait]
pub trait PersistedCartStore: Send + Sync {
    /// All lines for a user, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the query fails; callers may retry.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Insert a new line, letting the store assign its ID.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the write fails.
    async fn insert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        variant: &VariantSelection,
    ) -> Result<CartLine, RepositoryError>;

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the line does not exist,
    /// [`RepositoryError::Database`] otherwise.
    async fn update_quantity(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the line does not exist,
    /// [`RepositoryError::Database`] otherwise.
    async fn delete(&self, line_id: CartLineId) -> Result<(), RepositoryError>;

    /// Delete every line a user owns.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the write fails.
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

/// In-memory cart store (for development and tests).
#[derive(Default)]
pub struct MemoryCartStore {
    lines: RwLock<HashMap<UserId, Vec<CartLine>>>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistedCartStore for MemoryCartStore {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let lines = self.lines.read().unwrap();
        Ok(lines.get(&user_id).cloned().unwrap_or_default())
    }

    async fn insert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        variant: &VariantSelection,
    ) -> Result<CartLine, RepositoryError> {
        let line = CartLine {
            id: CartLineId::generate(),
            product_id,
            quantity,
            variant: variant.clone(),
        };
        #[allow(clippy::unwrap_used)]
        self.lines
            .write()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(line.clone());
        Ok(line)
    }

    async fn update_quantity(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let mut lines = self.lines.write().unwrap();
        for user_lines in lines.values_mut() {
            if let Some(line) = user_lines.iter_mut().find(|l| l.id == line_id) {
                line.quantity = quantity;
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound)
    }

    async fn delete(&self, line_id: CartLineId) -> Result<(), RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let mut lines = self.lines.write().unwrap();
        for user_lines in lines.values_mut() {
            let before = user_lines.len();
            user_lines.retain(|l| l.id != line_id);
            if user_lines.len() != before {
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        #[allow(clippy::unwrap_used)]
        self.lines.write().unwrap().remove(&user_id);
        Ok(())
    }
}
