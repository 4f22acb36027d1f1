//! Payment settlement verification.
//!
//! Entered when the shopper returns from the payment provider carrying a
//! session ID: `Verifying -> Settled | Failed`. The provider is the sole
//! source of truth for the outcome; the order table's unique
//! `payment_session_id` is the arbiter that makes the cart-to-order
//! transition happen exactly once, no matter how many times verification
//! runs.

use std::sync::Arc;

use atelier_core::{CurrencyCode, OrderNumber, Price, UserId};

use super::{SHIPPING_LINE_NAME, metadata_keys};
use crate::cart::CartService;
use crate::db::RepositoryError;
use crate::models::{Address, NewOrder, NewOrderItem};
use crate::orders::OrderStore;
use crate::payments::{PaymentGateway, PaymentOutcome, SessionDetails};

/// Terminal result of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Payment confirmed; the order exists (created now or previously).
    Settled { order_number: OrderNumber },
    /// No order was created and the cart was left untouched.
    Failed { reason: String },
}

/// Confirms payment sessions and transitions carts into orders.
pub struct SettlementVerifier {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    currency: CurrencyCode,
}

impl SettlementVerifier {
    #[must_use]
    pub const fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            gateway,
            orders,
            currency,
        }
    }

    /// Verify `session_id` and, on first confirmation, create the order and
    /// clear the shopper's cart.
    ///
    /// Re-running for an already-settled session is a safe no-op that
    /// reports the existing order. Failures never touch the cart, so the
    /// shopper can retry checkout without losing anything.
    pub async fn verify(&self, session_id: &str, cart: &CartService) -> SettlementOutcome {
        let details = match self.gateway.retrieve_session(session_id).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "settlement verification failed at provider");
                return SettlementOutcome::Failed {
                    reason: e.user_message().to_owned(),
                };
            }
        };

        if details.outcome != PaymentOutcome::Paid {
            tracing::info!(session_id, outcome = ?details.outcome, "session not paid");
            return SettlementOutcome::Failed {
                reason: "Payment was not completed.".to_owned(),
            };
        }

        // Idempotency check: a previous verification may already have
        // settled this session.
        match self.orders.find_by_payment_session(session_id).await {
            Ok(Some(existing)) => {
                return SettlementOutcome::Settled {
                    order_number: existing.order_number,
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(session_id, error = %e, "order lookup failed during settlement");
                return SettlementOutcome::Failed {
                    reason: "Could not verify your order. Please try again.".to_owned(),
                };
            }
        }

        let new_order = match self.build_order(&details) {
            Ok(order) => order,
            Err(reason) => {
                tracing::error!(session_id, reason, "paid session could not be turned into an order");
                return SettlementOutcome::Failed {
                    reason: reason.to_owned(),
                };
            }
        };

        match self.orders.create(new_order).await {
            Ok(order) => {
                tracing::info!(
                    session_id,
                    order_number = %order.order_number,
                    "payment settled, order created"
                );
                // Clearing the cart is best-effort: the order exists either
                // way, and an untouched cart is shopper-correctable.
                if let Err(e) = cart.clear().await {
                    tracing::warn!(session_id, error = %e, "cart clear after settlement failed");
                }
                SettlementOutcome::Settled {
                    order_number: order.order_number,
                }
            }
            // Lost a race with a concurrent verification of the same
            // session; whoever won created the order.
            Err(RepositoryError::Conflict(_)) => {
                match self.orders.find_by_payment_session(session_id).await {
                    Ok(Some(existing)) => SettlementOutcome::Settled {
                        order_number: existing.order_number,
                    },
                    _ => SettlementOutcome::Failed {
                        reason: "Could not verify your order. Please try again.".to_owned(),
                    },
                }
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "order creation failed");
                SettlementOutcome::Failed {
                    reason: "Could not record your order. Please contact support.".to_owned(),
                }
            }
        }
    }

    /// Assemble the durable order from the session's captured snapshot.
    fn build_order(&self, details: &SessionDetails) -> Result<NewOrder, &'static str> {
        let user_id: UserId = details
            .metadata
            .get(metadata_keys::USER_ID)
            .and_then(|raw| raw.parse().ok())
            .ok_or("This payment session was not issued by this storefront.")?;

        let shipping_cost_minor: i64 = details
            .metadata
            .get(metadata_keys::SHIPPING_COST_MINOR)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);

        let shipping_address: Option<Address> = details
            .metadata
            .get(metadata_keys::SHIPPING_ADDRESS)
            .and_then(|raw| serde_json::from_str(raw).ok());

        let currency = details.currency.unwrap_or(self.currency);

        // The synthetic shipping line becomes the order's shipping_cost,
        // not an item.
        let mut shipping_line_folded = false;
        let items: Vec<NewOrderItem> = details
            .line_items
            .iter()
            .filter(|item| {
                let is_shipping = !shipping_line_folded
                    && shipping_cost_minor > 0
                    && item.description == SHIPPING_LINE_NAME
                    && item.unit_amount == shipping_cost_minor;
                if is_shipping {
                    shipping_line_folded = true;
                }
                !is_shipping
            })
            .map(|item| NewOrderItem {
                product_name: item.description.clone(),
                unit_price: Price::from_minor_units(item.unit_amount, currency).amount,
                quantity: item.quantity,
                image_url: None,
            })
            .collect();

        if items.is_empty() {
            return Err("The payment session carried no purchasable items.");
        }

        let total = Price::from_minor_units(details.amount_total, currency).amount;
        let shipping_cost = Price::from_minor_units(shipping_cost_minor, currency).amount;

        Ok(NewOrder {
            user_id,
            payment_session_id: details.session_id.clone(),
            currency,
            subtotal: total - shipping_cost,
            shipping_cost,
            total,
            shipping_address,
            items,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use atelier_core::{OrderStatus, ProductId, VariantSelection};

    use super::*;
    use crate::cart::{
        CartBackend, CartEvents, MemoryCartStore, MemoryGuestStore, OwnerLocks,
        PersistedCartStore,
    };
    use crate::catalog::MemoryCatalog;
    use crate::models::Order;
    use crate::orders::MemoryOrderStore;
    use crate::payments::{CapturedLineItem, CreatedSession, PaymentError, SessionRequest};

    /// Gateway serving canned session details.
    #[derive(Default)]
    struct CannedGateway {
        sessions: Mutex<HashMap<String, SessionDetails>>,
    }

    impl CannedGateway {
        fn with_session(details: SessionDetails) -> Self {
            let gateway = Self::default();
            gateway
                .sessions
                .lock()
                .unwrap()
                .insert(details.session_id.clone(), details);
            gateway
        }
    }

    #[async_trait]
    impl PaymentGateway for CannedGateway {
        async fn create_session(
            &self,
            _: &SessionRequest,
        ) -> crate::payments::Result<CreatedSession> {
            Err(PaymentError::Provider("not under test".to_owned()))
        }

        async fn retrieve_session(
            &self,
            session_id: &str,
        ) -> crate::payments::Result<SessionDetails> {
            self.sessions
                .lock()
                .unwrap()
                .get(session_id)
                .cloned()
                .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_owned()))
        }
    }

    fn paid_session(session_id: &str, user_id: UserId) -> SessionDetails {
        let mut metadata = HashMap::new();
        metadata.insert(metadata_keys::USER_ID.to_owned(), user_id.to_string());
        metadata.insert(metadata_keys::SHIPPING_COST_MINOR.to_owned(), "1500".to_owned());
        metadata.insert(
            metadata_keys::SHIPPING_ADDRESS.to_owned(),
            serde_json::to_string(&Address {
                line1: "12 Marina Walk".to_owned(),
                city: "Dubai".to_owned(),
                postal_code: "00000".to_owned(),
                country: "AE".to_owned(),
            })
            .unwrap(),
        );
        SessionDetails {
            session_id: session_id.to_owned(),
            outcome: PaymentOutcome::Paid,
            amount_total: 16500,
            currency: Some(CurrencyCode::Aed),
            customer_email: Some("shopper@example.com".to_owned()),
            metadata,
            line_items: vec![
                CapturedLineItem {
                    description: "Linen Shirt (M)".to_owned(),
                    unit_amount: 6000,
                    quantity: 2,
                    amount_total: 12000,
                },
                CapturedLineItem {
                    description: "Silk Scarf".to_owned(),
                    unit_amount: 3000,
                    quantity: 1,
                    amount_total: 3000,
                },
                CapturedLineItem {
                    description: SHIPPING_LINE_NAME.to_owned(),
                    unit_amount: 1500,
                    quantity: 1,
                    amount_total: 1500,
                },
            ],
        }
    }

    struct Fixture {
        orders: Arc<MemoryOrderStore>,
        persisted: Arc<MemoryCartStore>,
        user_id: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                orders: Arc::new(MemoryOrderStore::new()),
                persisted: Arc::new(MemoryCartStore::new()),
                user_id: UserId::generate(),
            }
        }

        async fn cart_with_line(&self) -> CartService {
            let cart = self.cart();
            self.persisted
                .insert(self.user_id, ProductId::generate(), 2, &VariantSelection::none())
                .await
                .unwrap();
            cart
        }

        fn cart(&self) -> CartService {
            // Settlement only clears lines, so an empty catalog is fine here.
            let catalog = Arc::new(MemoryCatalog::new());
            CartService::new(
                CartBackend::Authenticated {
                    user_id: self.user_id,
                    store: self.persisted.clone(),
                    guest: Arc::new(MemoryGuestStore::new()),
                },
                catalog,
                CartEvents::new(),
                OwnerLocks::new(),
                CurrencyCode::Aed,
            )
        }

        fn verifier(&self, gateway: CannedGateway) -> SettlementVerifier {
            SettlementVerifier::new(Arc::new(gateway), self.orders.clone(), CurrencyCode::Aed)
        }
    }

    #[tokio::test]
    async fn paid_session_creates_pending_order_and_clears_cart() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;
        let verifier = fx.verifier(CannedGateway::with_session(paid_session("cs_1", fx.user_id)));

        let outcome = verifier.verify("cs_1", &cart).await;

        let SettlementOutcome::Settled { order_number } = outcome else {
            panic!("expected settled outcome");
        };

        let order = fx.orders.find_by_payment_session("cs_1").await.unwrap().unwrap();
        assert_eq!(order.order_number, order_number);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.user_id, fx.user_id);
        assert_eq!(order.total, Decimal::new(16500, 2));
        assert_eq!(order.shipping_cost, Decimal::new(1500, 2));
        assert_eq!(order.subtotal, Decimal::new(15000, 2));
        assert_eq!(order.shipping_address.as_ref().unwrap().city, "Dubai");

        // The shipping line was folded into shipping_cost, not stored.
        assert_eq!(order.items.len(), 2);
        assert!(order.items.iter().all(|i| i.product_name != SHIPPING_LINE_NAME));

        // Cart emptied.
        assert!(fx.persisted.list_for_user(fx.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reverification_is_a_no_op_with_the_same_order() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;
        let verifier = fx.verifier(CannedGateway::with_session(paid_session("cs_1", fx.user_id)));

        let first = verifier.verify("cs_1", &cart).await;

        // Shopper keeps shopping, then the success page re-runs verification.
        fx.persisted
            .insert(fx.user_id, ProductId::generate(), 1, &VariantSelection::none())
            .await
            .unwrap();

        let second = verifier.verify("cs_1", &cart).await;
        assert_eq!(first, second);

        // Exactly one order, and the new cart was NOT cleared.
        assert_eq!(fx.orders.list_for_user(fx.user_id).await.unwrap().len(), 1);
        assert_eq!(fx.persisted.list_for_user(fx.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unpaid_session_fails_without_touching_anything() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;
        let mut details = paid_session("cs_1", fx.user_id);
        details.outcome = PaymentOutcome::Unpaid;
        let verifier = fx.verifier(CannedGateway::with_session(details));

        let outcome = verifier.verify("cs_1", &cart).await;

        assert!(matches!(outcome, SettlementOutcome::Failed { .. }));
        assert!(fx.orders.find_by_payment_session("cs_1").await.unwrap().is_none());
        assert_eq!(fx.persisted.list_for_user(fx.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_fails() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;
        let verifier = fx.verifier(CannedGateway::default());

        let outcome = verifier.verify("cs_gone", &cart).await;

        assert!(matches!(outcome, SettlementOutcome::Failed { .. }));
        assert_eq!(fx.persisted.list_for_user(fx.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_without_storefront_metadata_fails() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;
        let mut details = paid_session("cs_1", fx.user_id);
        details.metadata.clear();
        let verifier = fx.verifier(CannedGateway::with_session(details));

        let outcome = verifier.verify("cs_1", &cart).await;

        assert!(matches!(outcome, SettlementOutcome::Failed { .. }));
        assert!(fx.orders.find_by_payment_session("cs_1").await.unwrap().is_none());
    }

    /// Order store that hides the order from the first lookup, forcing the
    /// verifier down the create-conflict path.
    struct RacingOrderStore {
        inner: Arc<MemoryOrderStore>,
        hide_first_lookup: AtomicBool,
    }

    #[async_trait]
    impl OrderStore for RacingOrderStore {
        async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
            self.inner.create(order).await
        }

        async fn find_by_payment_session(
            &self,
            session_id: &str,
        ) -> Result<Option<Order>, RepositoryError> {
            if self.hide_first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_payment_session(session_id).await
        }

        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn concurrent_settlement_race_resolves_to_the_existing_order() {
        let fx = Fixture::new();
        let cart = fx.cart_with_line().await;

        // A concurrent verification settled the session between our lookup
        // and our insert.
        let winner = fx.verifier(CannedGateway::with_session(paid_session("cs_1", fx.user_id)));
        let SettlementOutcome::Settled { order_number: winners_number } =
            winner.verify("cs_1", &cart).await
        else {
            panic!("setup verification should settle");
        };

        let racing_store = Arc::new(RacingOrderStore {
            inner: fx.orders.clone(),
            hide_first_lookup: AtomicBool::new(true),
        });
        let loser = SettlementVerifier::new(
            Arc::new(CannedGateway::with_session(paid_session("cs_1", fx.user_id))),
            racing_store,
            CurrencyCode::Aed,
        );

        let outcome = loser.verify("cs_1", &cart).await;
        assert_eq!(
            outcome,
            SettlementOutcome::Settled {
                order_number: winners_number
            }
        );
        assert_eq!(fx.orders.list_for_user(fx.user_id).await.unwrap().len(), 1);
    }
}
