//! Cart change notifications.
//!
//! Every cart mutation publishes a [`CartChanged`] event; any number of
//! subscribers (other tabs via SSE, in-process listeners) re-read the
//! snapshot on receipt. This replaces ad hoc cross-tab event names with one
//! subscription channel.

use tokio::sync::broadcast;

use atelier_core::UserId;

/// Who a cart belongs to, for event filtering and mutation serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    /// Anonymous shopper, keyed by their session.
    Guest(String),
    /// Signed-in shopper.
    User(UserId),
}

/// A cart's contents changed.
#[derive(Debug, Clone)]
pub struct CartChanged {
    pub owner: CartOwner,
}

/// Broadcast channel for cart change events.
///
/// Created once at startup and handed to whoever needs it - never looked up
/// through ambient global state. Lagging subscribers drop old events; that
/// is fine because consumers re-read the full snapshot anyway.
#[derive(Clone)]
pub struct CartEvents {
    tx: broadcast::Sender<CartChanged>,
}

impl CartEvents {
    const CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    /// Announce a change to `owner`'s cart. Dropped silently when nobody is
    /// listening.
    pub fn publish(&self, owner: CartOwner) {
        let _ = self.tx.send(CartChanged { owner });
    }

    /// Subscribe to all cart changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartChanged> {
        self.tx.subscribe()
    }
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = CartEvents::new();
        let mut rx = events.subscribe();

        let owner = CartOwner::User(UserId::generate());
        events.publish(owner.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.owner, owner);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let events = CartEvents::new();
        events.publish(CartOwner::Guest("sess-1".to_owned()));
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let events = CartEvents::new();
        let mut rx1 = events.subscribe();
        let mut rx2 = events.subscribe();

        events.publish(CartOwner::Guest("sess-2".to_owned()));

        assert!(matches!(rx1.recv().await.unwrap().owner, CartOwner::Guest(_)));
        assert!(matches!(rx2.recv().await.unwrap().owner, CartOwner::Guest(_)));
    }
}
