//! Guest-to-authenticated cart flows through the real facade and
//! reconciliation engine.

#![allow(clippy::unwrap_used)]

use atelier_core::VariantSelection;
use atelier_integration_tests::TestStorefront;
use atelier_storefront::cart::{GuestCartStore, PersistedCartStore};

fn size(s: &str) -> VariantSelection {
    VariantSelection::new(Some(s.to_owned()), None)
}

#[tokio::test]
async fn guest_cart_merges_once_at_sign_in() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let scarf = shop.add_product("Silk Scarf", 10000);
    let shopper = shop.shopper();

    // Anonymous browsing: two lines in the guest slot.
    let guest = shop.guest_cart();
    guest.add_line(shirt, 2, size("M")).await.unwrap();
    guest.add_line(scarf, 1, VariantSelection::none()).await.unwrap();

    // The shopper already had a persisted line for the same shirt config.
    shop.persisted.insert(shopper.id, shirt, 1, &size("M")).await.unwrap();

    // Sign-in: quantities are additive, the unmatched line is inserted,
    // and the guest slot drains.
    let cart = shop.shopper_cart(shopper.id);
    let report = cart.reconcile().await;
    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 0);

    let items = cart.items().await.unwrap();
    assert_eq!(items.len(), 2);
    let shirt_line = items.iter().find(|i| i.line.product_id == shirt).unwrap();
    assert_eq!(shirt_line.line.quantity, 3);
    assert!(shop.guest_store.read().await.is_empty());

    // Signing in again with an empty guest cart changes nothing.
    let report = cart.reconcile().await;
    assert!(!report.merged_any());
    assert_eq!(cart.count().await.unwrap(), 4);
}

#[tokio::test]
async fn concurrent_sign_in_reads_merge_exactly_once() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    shop.guest_cart().add_line(shirt, 2, size("M")).await.unwrap();

    // Two tabs hit the API at the same moment after sign-in. Both run the
    // guarded merge; the owner lock serializes them and the second pass
    // finds the guest slot already empty.
    let cart_a = shop.shopper_cart(shopper.id);
    let cart_b = shop.shopper_cart(shopper.id);
    let (a, b) = tokio::join!(cart_a.items(), cart_b.items());

    assert_eq!(a.unwrap().first().unwrap().line.quantity, 2);
    assert_eq!(b.unwrap().first().unwrap().line.quantity, 2);

    let lines = shop.persisted.list_for_user(shopper.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity, 2);
}

#[tokio::test]
async fn facade_semantics_are_identical_across_the_boundary() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    // Guest: increment-or-create.
    let guest = shop.guest_cart();
    guest.add_line(shirt, 1, size("M")).await.unwrap();
    guest.add_line(shirt, 2, size("M")).await.unwrap();
    assert_eq!(guest.items().await.unwrap().len(), 1);
    assert_eq!(guest.count().await.unwrap(), 3);

    // Authenticated: same contract against the persisted store.
    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 1, size("M")).await.unwrap();
    let items = cart.items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap().line.quantity, 4);
}

#[tokio::test]
async fn other_tabs_hear_about_mutations() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);

    let mut tab = shop.events.subscribe();
    let cart = shop.guest_cart();
    let owner = cart.owner();

    cart.add_line(shirt, 1, VariantSelection::none()).await.unwrap();

    let event = tab.recv().await.unwrap();
    assert_eq!(event.owner, owner);
}

#[tokio::test]
async fn sign_out_never_moves_the_cart_back() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    shop.guest_cart().add_line(shirt, 2, size("M")).await.unwrap();
    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    assert_eq!(cart.count().await.unwrap(), 2);

    // After sign-out the device is anonymous again: the guest slot is
    // empty, and the merged lines stay server-side.
    let guest = shop.guest_cart();
    assert!(guest.items().await.unwrap().is_empty());
    assert_eq!(
        shop.persisted.list_for_user(shopper.id).await.unwrap().len(),
        1
    );
}
