//! Cart facade.
//!
//! [`CartService`] is the single API presentation code may call. It holds
//! exactly one [`CartBackend`] - guest or authenticated, chosen from the
//! session identity at construction and switched irreversibly at sign-in -
//! so no operation ever branches on "is there a user" beyond that one tag.
//!
//! Mutations are serialized per cart owner: the guest slot is a
//! read-whole/write-whole record, and two concurrent read-modify-write
//! cycles would lose updates without the lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use atelier_core::{CartLineId, CurrencyCode, Price, ProductId, UserId, VariantSelection};

use super::guest::GuestCartStore;
use super::notify::{CartEvents, CartOwner};
use super::reconcile::{self, MergeReport};
use super::store::PersistedCartStore;
use crate::catalog::ProductCatalog;
use crate::db::RepositoryError;
use crate::models::{CartItem, CartLine, CartSnapshot};

/// Errors surfaced past the facade boundary.
///
/// Guest-store trouble never appears here - it degrades to an empty cart by
/// contract. What does appear is retryable by design: `add_line` is
/// increment-or-create, so repeating a failed call cannot duplicate a line.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The persisted store or catalog could not be reached. Retry later.
    #[error("cart storage unavailable: {0}")]
    Unavailable(#[source] RepositoryError),

    /// The targeted line does not exist in the active cart.
    #[error("cart line not found")]
    LineNotFound,
}

impl CartError {
    /// Whether the caller may safely retry the same operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<RepositoryError> for CartError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::LineNotFound,
            other => Self::Unavailable(other),
        }
    }
}

/// Which store is authoritative for this shopper's cart.
///
/// There is no "both" state: once a shopper is known, reads and writes go
/// to the persisted store only (the guest store is consulted once, by the
/// reconciliation pass, and then left empty).
pub enum CartBackend {
    /// Anonymous shopper; the session slot owns the cart.
    Guest {
        /// Stable key for lock/event scoping, derived from the session.
        session_key: String,
        store: Arc<dyn GuestCartStore>,
    },
    /// Signed-in shopper; the persisted store owns the cart.
    Authenticated {
        user_id: UserId,
        store: Arc<dyn PersistedCartStore>,
        /// Kept only so the one-time merge can drain it.
        guest: Arc<dyn GuestCartStore>,
    },
}

/// Per-owner mutation locks.
///
/// Backed by a moka cache so entries for long-gone shoppers age out; one
/// hour of idleness far exceeds any request or merge lifetime.
#[derive(Clone)]
pub struct OwnerLocks {
    locks: moka::future::Cache<CartOwner, Arc<Mutex<()>>>,
}

impl OwnerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: moka::future::Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(3600))
                .build(),
        }
    }

    async fn handle(&self, owner: &CartOwner) -> Arc<Mutex<()>> {
        self.locks
            .get_with(owner.clone(), async { Arc::new(Mutex::new(())) })
            .await
    }
}

impl Default for OwnerLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// The cart operation surface.
pub struct CartService {
    backend: CartBackend,
    catalog: Arc<dyn ProductCatalog>,
    events: CartEvents,
    locks: OwnerLocks,
    currency: CurrencyCode,
}

impl CartService {
    #[must_use]
    pub const fn new(
        backend: CartBackend,
        catalog: Arc<dyn ProductCatalog>,
        events: CartEvents,
        locks: OwnerLocks,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            backend,
            catalog,
            events,
            locks,
            currency,
        }
    }

    /// The owner this service's lock and events are scoped to.
    #[must_use]
    pub fn owner(&self) -> CartOwner {
        match &self.backend {
            CartBackend::Guest { session_key, .. } => CartOwner::Guest(session_key.clone()),
            CartBackend::Authenticated { user_id, .. } => CartOwner::User(*user_id),
        }
    }

    /// Signed-in shopper's ID, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match &self.backend {
            CartBackend::Guest { .. } => None,
            CartBackend::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    /// Run the one-time guest cart merge for a signed-in shopper.
    ///
    /// Called eagerly at sign-in; every other operation also runs it as a
    /// backstop. Both paths share the owner lock and the skip-when-empty
    /// fast path, so the merge applies at most once.
    pub async fn reconcile(&self) -> MergeReport {
        let owner = self.owner();
        let lock = self.locks.handle(&owner).await;
        let _guard = lock.lock().await;
        self.reconcile_locked().await
    }

    /// Merge while already holding the owner lock.
    async fn reconcile_locked(&self) -> MergeReport {
        let CartBackend::Authenticated {
            user_id,
            store,
            guest,
        } = &self.backend
        else {
            return MergeReport::skipped();
        };

        let report = reconcile::merge_guest_cart(guest.as_ref(), store.as_ref(), *user_id).await;
        if report.merged_any() {
            self.events.publish(self.owner());
        }
        report
    }

    /// Add `quantity` of a product configuration to the cart.
    ///
    /// If a line with the same `(product_id, variant)` already exists its
    /// quantity is incremented; otherwise a new line is created. Identical
    /// for guest and authenticated shoppers.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the persisted store rejects
    /// the write; the operation is safe to retry.
    pub async fn add_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        variant: VariantSelection,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }
        let owner = self.owner();
        let lock = self.locks.handle(&owner).await;
        {
            let _guard = lock.lock().await;
            self.reconcile_locked().await;

            match &self.backend {
                CartBackend::Guest { store, .. } => {
                    let mut lines = store.read().await;
                    if let Some(line) =
                        lines.iter_mut().find(|l| l.matches(product_id, &variant))
                    {
                        line.quantity = line.quantity.saturating_add(quantity);
                    } else {
                        lines.push(CartLine::new(product_id, quantity, variant));
                    }
                    Self::write_guest(store.as_ref(), &lines).await;
                }
                CartBackend::Authenticated { user_id, store, .. } => {
                    let lines = store.list_for_user(*user_id).await?;
                    match lines.iter().find(|l| l.matches(product_id, &variant)) {
                        Some(line) => {
                            store
                                .update_quantity(line.id, line.quantity.saturating_add(quantity))
                                .await?;
                        }
                        None => {
                            store.insert(*user_id, product_id, quantity, &variant).await?;
                        }
                    }
                }
            }
        }
        self.events.publish(owner);
        Ok(())
    }

    /// Set a line's quantity. Anything at or below zero removes the line -
    /// a non-positive quantity is never stored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line does not exist,
    /// [`CartError::Unavailable`] if the store rejects the write.
    pub async fn set_quantity(&self, line_id: CartLineId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_line(line_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let owner = self.owner();
        let lock = self.locks.handle(&owner).await;
        {
            let _guard = lock.lock().await;
            self.reconcile_locked().await;

            match &self.backend {
                CartBackend::Guest { store, .. } => {
                    let mut lines = store.read().await;
                    let Some(line) = lines.iter_mut().find(|l| l.id == line_id) else {
                        return Err(CartError::LineNotFound);
                    };
                    line.quantity = quantity;
                    Self::write_guest(store.as_ref(), &lines).await;
                }
                CartBackend::Authenticated { store, .. } => {
                    store.update_quantity(line_id, quantity).await?;
                }
            }
        }
        self.events.publish(owner);
        Ok(())
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line does not exist,
    /// [`CartError::Unavailable`] if the store rejects the write.
    pub async fn remove_line(&self, line_id: CartLineId) -> Result<(), CartError> {
        let owner = self.owner();
        let lock = self.locks.handle(&owner).await;
        {
            let _guard = lock.lock().await;
            self.reconcile_locked().await;

            match &self.backend {
                CartBackend::Guest { store, .. } => {
                    let mut lines = store.read().await;
                    let before = lines.len();
                    lines.retain(|l| l.id != line_id);
                    if lines.len() == before {
                        return Err(CartError::LineNotFound);
                    }
                    Self::write_guest(store.as_ref(), &lines).await;
                }
                CartBackend::Authenticated { store, .. } => {
                    store.delete(line_id).await?;
                }
            }
        }
        self.events.publish(owner);
        Ok(())
    }

    /// Empty the cart in whichever store is authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the persisted store rejects
    /// the write.
    pub async fn clear(&self) -> Result<(), CartError> {
        let owner = self.owner();
        let lock = self.locks.handle(&owner).await;
        {
            let _guard = lock.lock().await;

            match &self.backend {
                CartBackend::Guest { store, .. } => {
                    if let Err(e) = store.clear().await {
                        tracing::warn!(error = %e, "guest cart clear failed");
                    }
                }
                CartBackend::Authenticated { user_id, store, .. } => {
                    store.delete_all_for_user(*user_id).await?;
                }
            }
        }
        self.events.publish(owner);
        Ok(())
    }

    /// The cart's lines joined with live catalog data.
    ///
    /// Products missing from the catalog (deleted since being added) drop
    /// out of the view rather than erroring.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the persisted store or the
    /// catalog cannot be read.
    pub async fn items(&self) -> Result<Vec<CartItem>, CartError> {
        let lines = {
            let owner = self.owner();
            let lock = self.locks.handle(&owner).await;
            let _guard = lock.lock().await;
            self.reconcile_locked().await;

            match &self.backend {
                CartBackend::Guest { store, .. } => store.read().await,
                CartBackend::Authenticated { user_id, store, .. } => {
                    store.list_for_user(*user_id).await?
                }
            }
        };

        if lines.is_empty() {
            return Ok(Vec::new());
        }

        // Unit prices are read here, at snapshot time - an open cart tracks
        // catalog price changes until settlement freezes them into an order.
        let mut seen = std::collections::HashSet::new();
        let ids: Vec<ProductId> = lines
            .iter()
            .map(|l| l.product_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let products = self
            .catalog
            .products_by_ids(&ids)
            .await
            .map_err(CartError::Unavailable)?;

        let items = lines
            .into_iter()
            .filter_map(|line| {
                let product = products.iter().find(|p| p.id == line.product_id);
                if product.is_none() {
                    tracing::debug!(product_id = %line.product_id, "cart line for unknown product skipped");
                }
                product.cloned().map(|product| CartItem { line, product })
            })
            .collect();
        Ok(items)
    }

    /// Priced snapshot of the cart: items plus derived totals.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the stores cannot be read.
    pub async fn snapshot(&self) -> Result<CartSnapshot, CartError> {
        Ok(CartSnapshot::new(self.items().await?, self.currency))
    }

    /// Sum of `unit_price x quantity` over all lines, at live prices.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the stores cannot be read.
    pub async fn subtotal(&self) -> Result<Price, CartError> {
        Ok(self.snapshot().await?.subtotal)
    }

    /// Total quantity across all lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Unavailable`] if the stores cannot be read.
    pub async fn count(&self) -> Result<u32, CartError> {
        Ok(self.snapshot().await?.count)
    }

    /// Write the guest slot, degrading silently on storage trouble.
    async fn write_guest(store: &dyn GuestCartStore, lines: &[CartLine]) {
        if let Err(e) = store.write(lines).await {
            tracing::warn!(error = %e, "guest cart write failed, change not persisted");
        }
    }
}
