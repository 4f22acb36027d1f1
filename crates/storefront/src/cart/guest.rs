//! Guest cart storage.
//!
//! An unauthenticated shopper's cart is one durable value in their session:
//! the whole line collection, read and written as a unit, so the slot never
//! observes a partial update. Storage trouble degrades to an empty cart -
//! it is never surfaced to the shopper.

use async_trait::async_trait;
use tower_sessions::Session;

use crate::models::{CartLine, session_keys};

/// Error writing the guest cart slot.
///
/// Callers log and continue; a guest cart is best-effort by contract.
#[derive(Debug, thiserror::Error)]
#[error("guest cart storage unavailable: {0}")]
pub struct GuestStoreError(#[from] tower_sessions::session::Error);

/// The single-slot store backing a guest cart.
#[async_trait]
pub trait GuestCartStore: Send + Sync {
    /// Read the whole collection. Unavailable or corrupt storage reads as
    /// empty.
    async fn read(&self) -> Vec<CartLine>;

    /// Replace the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`GuestStoreError`] if the slot cannot be written.
    async fn write(&self, lines: &[CartLine]) -> Result<(), GuestStoreError>;

    /// Empty the slot.
    ///
    /// # Errors
    ///
    /// Returns [`GuestStoreError`] if the slot cannot be cleared.
    async fn clear(&self) -> Result<(), GuestStoreError>;
}

/// Production guest store: the `guest_cart` key of the shopper's session.
#[derive(Clone)]
pub struct SessionGuestStore {
    session: Session,
}

impl SessionGuestStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl GuestCartStore for SessionGuestStore {
    async fn read(&self) -> Vec<CartLine> {
        match self.session.get::<Vec<CartLine>>(session_keys::GUEST_CART).await {
            Ok(Some(lines)) => lines,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "guest cart slot unreadable, degrading to empty");
                Vec::new()
            }
        }
    }

    async fn write(&self, lines: &[CartLine]) -> Result<(), GuestStoreError> {
        self.session
            .insert(session_keys::GUEST_CART, lines)
            .await
            .map_err(GuestStoreError)
    }

    async fn clear(&self) -> Result<(), GuestStoreError> {
        self.session
            .remove::<Vec<CartLine>>(session_keys::GUEST_CART)
            .await
            .map(|_| ())
            .map_err(GuestStoreError)
    }
}

/// In-memory guest store (for development and tests).
#[derive(Default)]
pub struct MemoryGuestStore {
    lines: std::sync::RwLock<Vec<CartLine>>,
}

impl MemoryGuestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuestCartStore for MemoryGuestStore {
    async fn read(&self) -> Vec<CartLine> {
        #[allow(clippy::unwrap_used)]
        self.lines.read().unwrap().clone()
    }

    async fn write(&self, lines: &[CartLine]) -> Result<(), GuestStoreError> {
        #[allow(clippy::unwrap_used)]
        {
            *self.lines.write().unwrap() = lines.to_vec();
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), GuestStoreError> {
        #[allow(clippy::unwrap_used)]
        {
            self.lines.write().unwrap().clear();
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session};

    use atelier_core::{ProductId, VariantSelection};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn empty_slot_reads_as_empty() {
        let store = SessionGuestStore::new(session());
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn write_replaces_whole_collection() {
        let store = SessionGuestStore::new(session());
        let first = vec![CartLine::new(ProductId::generate(), 2, VariantSelection::none())];
        store.write(&first).await.unwrap();
        assert_eq!(store.read().await, first);

        let second = vec![
            CartLine::new(ProductId::generate(), 1, VariantSelection::none()),
            CartLine::new(ProductId::generate(), 3, VariantSelection::none()),
        ];
        store.write(&second).await.unwrap();
        assert_eq!(store.read().await, second);
    }

    #[tokio::test]
    async fn clear_empties_the_slot() {
        let store = SessionGuestStore::new(session());
        store
            .write(&[CartLine::new(ProductId::generate(), 1, VariantSelection::none())])
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_slot_degrades_to_empty() {
        let session = session();
        session
            .insert(session_keys::GUEST_CART, "definitely not a cart")
            .await
            .unwrap();
        let store = SessionGuestStore::new(session);
        assert!(store.read().await.is_empty());
    }
}
