//! Product catalog seam.
//!
//! The catalog is an external collaborator: the cart core reads live
//! name/price/image data per product and never writes back. The trait keeps
//! the core testable without a database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use atelier_core::ProductId;

use crate::db::RepositoryError;
use crate::models::ProductSummary;

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch summaries for the given product IDs.
    ///
    /// Unknown IDs are simply absent from the result (deleted products drop
    /// out of carts rather than erroring).
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the lookup fails; callers may retry.
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError>;
}

/// In-memory catalog (for development and tests).
#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<ProductId, ProductSummary>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn upsert(&self, product: ProductSummary) {
        #[allow(clippy::unwrap_used)]
        self.products.write().unwrap().insert(product.id, product);
    }

    /// Remove a product, as if it were deleted from the catalog.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove(&self, id: ProductId) {
        #[allow(clippy::unwrap_used)]
        self.products.write().unwrap().remove(&id);
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        #[allow(clippy::unwrap_used)]
        let products = self.products.read().unwrap();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}
