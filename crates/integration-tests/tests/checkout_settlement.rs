//! Checkout and settlement flows: initiator -> fake provider -> verifier.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use atelier_core::{OrderStatus, VariantSelection};
use atelier_integration_tests::TestStorefront;
use atelier_storefront::checkout::{
    CheckoutDetails, CheckoutError, CustomerDetails, SettlementOutcome, ShippingMethod,
};
use atelier_storefront::models::Address;
use atelier_storefront::orders::OrderStore;

fn checkout_details(shipping: ShippingMethod) -> CheckoutDetails {
    CheckoutDetails {
        customer: CustomerDetails {
            email: "shopper@example.com".to_owned(),
            first_name: "Nour".to_owned(),
            last_name: "Haddad".to_owned(),
            phone: Some("+971500000000".to_owned()),
        },
        shipping_address: Address {
            line1: "12 Marina Walk".to_owned(),
            city: "Dubai".to_owned(),
            postal_code: "00000".to_owned(),
            country: "AE".to_owned(),
        },
        shipping_method: shipping,
    }
}

#[tokio::test]
async fn full_checkout_settles_into_exactly_one_order() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 6000);
    let scarf = shop.add_product("Silk Scarf", 3000);
    let shopper = shop.shopper();

    // Cart totals 150.00; express shipping adds 15.00.
    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 2, VariantSelection::new(Some("M".to_owned()), None))
        .await
        .unwrap();
    cart.add_line(scarf, 1, VariantSelection::none()).await.unwrap();

    let snapshot = cart.snapshot().await.unwrap();
    assert_eq!(snapshot.subtotal.amount, Decimal::new(15000, 2));

    let created = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Express))
        .await
        .unwrap();
    assert!(created.redirect_url.contains(&created.session_id));

    // The provider captured N product lines + 1 shipping line = 165.00.
    let request = shop.gateway.requests().pop().unwrap();
    let total: i64 = request
        .line_items
        .iter()
        .map(|l| l.unit_amount * i64::from(l.quantity))
        .sum();
    assert_eq!(total, 16500);
    assert!(request.line_items.iter().all(|l| l.quantity > 0 && l.unit_amount > 0));

    // Initiating a checkout must not touch the cart.
    assert_eq!(cart.count().await.unwrap(), 3);

    // Shopper pays on the hosted page and returns.
    shop.gateway.complete_payment(&created.session_id);
    let outcome = shop.verifier().verify(&created.session_id, &cart).await;

    let SettlementOutcome::Settled { order_number } = outcome else {
        panic!("expected settlement");
    };

    let order = shop
        .orders
        .find_by_payment_session(&created.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.order_number, order_number);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::new(16500, 2));
    assert_eq!(order.shipping_cost, Decimal::new(1500, 2));
    assert_eq!(order.subtotal, Decimal::new(15000, 2));
    assert_eq!(order.items.len(), 2);
    assert_eq!(
        order.items.first().unwrap().product_name,
        "Linen Shirt (M)"
    );

    // Settlement cleared the cart.
    assert_eq!(cart.count().await.unwrap(), 0);

    // Re-verification (success page reload) is a no-op.
    let again = shop.verifier().verify(&created.session_id, &cart).await;
    assert_eq!(
        again,
        SettlementOutcome::Settled {
            order_number: order.order_number.clone()
        }
    );
    assert_eq!(shop.orders.list_for_user(shopper.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn order_snapshot_survives_catalog_edits() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 1, VariantSelection::none()).await.unwrap();

    let snapshot = cart.snapshot().await.unwrap();
    let created = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Standard))
        .await
        .unwrap();
    shop.gateway.complete_payment(&created.session_id);
    shop.verifier().verify(&created.session_id, &cart).await;

    // The product vanishes from the catalog; the order is unmoved.
    shop.catalog.remove(shirt);
    let order = shop
        .orders
        .find_by_payment_session(&created.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.items.first().unwrap().product_name, "Linen Shirt");
    assert_eq!(order.items.first().unwrap().unit_price, Decimal::new(12000, 2));
}

#[tokio::test]
async fn abandoned_attempts_leak_sessions_but_never_orders() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 1, VariantSelection::none()).await.unwrap();
    let snapshot = cart.snapshot().await.unwrap();

    // The shopper starts checkout twice and walks away twice: two
    // provider sessions, zero orders, cart untouched.
    let first = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Standard))
        .await
        .unwrap();
    let second = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Standard))
        .await
        .unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(shop.gateway.session_count(), 2);
    assert!(shop.orders.list_for_user(shopper.id).await.unwrap().is_empty());
    assert_eq!(cart.count().await.unwrap(), 1);
}

#[tokio::test]
async fn unpaid_return_fails_and_preserves_the_cart() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 2, VariantSelection::none()).await.unwrap();
    let snapshot = cart.snapshot().await.unwrap();

    let created = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Standard))
        .await
        .unwrap();

    // Return without paying.
    let outcome = shop.verifier().verify(&created.session_id, &cart).await;
    assert!(matches!(outcome, SettlementOutcome::Failed { .. }));
    assert!(shop.orders.list_for_user(shopper.id).await.unwrap().is_empty());
    assert_eq!(cart.count().await.unwrap(), 2);
}

#[tokio::test]
async fn provider_side_expiry_verifies_as_failed() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 1, VariantSelection::none()).await.unwrap();
    let snapshot = cart.snapshot().await.unwrap();

    let created = shop
        .initiator()
        .start(&shopper, &snapshot, &checkout_details(ShippingMethod::Standard))
        .await
        .unwrap();
    shop.gateway.expire(&created.session_id);

    let outcome = shop.verifier().verify(&created.session_id, &cart).await;
    assert!(matches!(outcome, SettlementOutcome::Failed { .. }));
    assert_eq!(cart.count().await.unwrap(), 1);
}

#[tokio::test]
async fn validation_failures_create_no_session() {
    let shop = TestStorefront::new();
    let shirt = shop.add_product("Linen Shirt", 12000);
    let shopper = shop.shopper();

    let cart = shop.shopper_cart(shopper.id);
    cart.reconcile().await;
    cart.add_line(shirt, 1, VariantSelection::none()).await.unwrap();
    let snapshot = cart.snapshot().await.unwrap();

    let mut details = checkout_details(ShippingMethod::Standard);
    details.customer.email = String::new();
    details.shipping_address.country = String::new();

    let err = shop
        .initiator()
        .start(&shopper, &snapshot, &details)
        .await
        .unwrap_err();

    match err {
        CheckoutError::Validation { missing } => {
            assert!(missing.contains(&"email"));
            assert!(missing.contains(&"shipping_address.country"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(shop.gateway.session_count(), 0);
}
