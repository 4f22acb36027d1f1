//! Shared fixtures for the flow tests.
//!
//! The storefront's collaborator seams (stores, catalog, payment gateway)
//! are swapped for in-memory fakes here, so the tests drive the real
//! facade, reconciliation engine, initiator, and verifier end-to-end with
//! no database or network.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)] // test support code

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use atelier_core::{CurrencyCode, Email, Price, ProductId, UserId};
use atelier_storefront::cart::{
    CartBackend, CartEvents, CartService, MemoryCartStore, MemoryGuestStore, OwnerLocks,
};
use atelier_storefront::catalog::MemoryCatalog;
use atelier_storefront::checkout::{CheckoutInitiator, SettlementVerifier};
use atelier_storefront::models::{CurrentShopper, ProductSummary};
use atelier_storefront::orders::MemoryOrderStore;
use atelier_storefront::payments::{
    CapturedLineItem, CreatedSession, PaymentError, PaymentGateway, PaymentOutcome,
    SessionDetails, SessionRequest,
};

/// Payment provider fake: sessions are created `Unpaid` and flipped to
/// `Paid` when the "shopper" completes the hosted page.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, SessionDetails>>,
    requests: Mutex<Vec<SessionRequest>>,
    counter: AtomicUsize,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the shopper paying on the provider's hosted page.
    pub fn complete_payment(&self, session_id: &str) {
        if let Some(details) = self.sessions.lock().unwrap().get_mut(session_id) {
            details.outcome = PaymentOutcome::Paid;
        }
    }

    /// Simulate provider-side session expiry.
    pub fn expire(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }

    /// How many sessions have been created.
    pub fn session_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    /// Every request the initiator sent.
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_fake_{n}");

        let line_items: Vec<CapturedLineItem> = request
            .line_items
            .iter()
            .map(|item| CapturedLineItem {
                description: item.name.clone(),
                unit_amount: item.unit_amount,
                quantity: item.quantity,
                amount_total: item.unit_amount * i64::from(item.quantity),
            })
            .collect();
        let amount_total = line_items.iter().map(|item| item.amount_total).sum();

        self.sessions.lock().unwrap().insert(
            session_id.clone(),
            SessionDetails {
                session_id: session_id.clone(),
                outcome: PaymentOutcome::Unpaid,
                amount_total,
                currency: Some(request.currency),
                customer_email: Some(request.customer_email.clone()),
                metadata: request.metadata.clone(),
                line_items,
            },
        );

        Ok(CreatedSession {
            redirect_url: format!("https://pay.fake/checkout/{session_id}"),
            session_id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, PaymentError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_owned()))
    }
}

/// One storefront's worth of in-memory collaborators.
pub struct TestStorefront {
    pub catalog: Arc<MemoryCatalog>,
    pub guest_store: Arc<MemoryGuestStore>,
    pub persisted: Arc<MemoryCartStore>,
    pub orders: Arc<MemoryOrderStore>,
    pub gateway: Arc<FakeGateway>,
    pub events: CartEvents,
    pub locks: OwnerLocks,
    pub currency: CurrencyCode,
}

impl TestStorefront {
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(MemoryCatalog::new()),
            guest_store: Arc::new(MemoryGuestStore::new()),
            persisted: Arc::new(MemoryCartStore::new()),
            orders: Arc::new(MemoryOrderStore::new()),
            gateway: Arc::new(FakeGateway::new()),
            events: CartEvents::new(),
            locks: OwnerLocks::new(),
            currency: CurrencyCode::Aed,
        }
    }

    /// Seed a product and return its ID.
    pub fn add_product(&self, name: &str, price_minor: i64) -> ProductId {
        let id = ProductId::generate();
        self.catalog.upsert(ProductSummary {
            id,
            name: name.to_owned(),
            slug: name.to_lowercase().replace(' ', "-"),
            unit_price: Price::from_minor_units(price_minor, self.currency),
            image_url: Some(format!(
                "https://cdn.atelier.test/{}.jpg",
                name.to_lowercase().replace(' ', "-")
            )),
        });
        id
    }

    /// A signed-in shopper identity.
    pub fn shopper(&self) -> CurrentShopper {
        CurrentShopper {
            id: UserId::generate(),
            email: Email::parse("shopper@example.com").unwrap(),
        }
    }

    /// Cart facade for an anonymous session.
    pub fn guest_cart(&self) -> CartService {
        CartService::new(
            CartBackend::Guest {
                session_key: "itest-session".to_owned(),
                store: self.guest_store.clone(),
            },
            self.catalog.clone(),
            self.events.clone(),
            self.locks.clone(),
            self.currency,
        )
    }

    /// Cart facade for a signed-in shopper (same device: shares the guest
    /// slot the anonymous facade wrote).
    pub fn shopper_cart(&self, user_id: UserId) -> CartService {
        CartService::new(
            CartBackend::Authenticated {
                user_id,
                store: self.persisted.clone(),
                guest: self.guest_store.clone(),
            },
            self.catalog.clone(),
            self.events.clone(),
            self.locks.clone(),
            self.currency,
        )
    }

    /// Checkout initiator wired to the fake gateway.
    pub fn initiator(&self) -> CheckoutInitiator {
        CheckoutInitiator::new(
            self.gateway.clone(),
            self.currency,
            "https://shop.test/payment-success?session_id={CHECKOUT_SESSION_ID}".to_owned(),
            "https://shop.test/checkout".to_owned(),
        )
    }

    /// Settlement verifier wired to the fake gateway and order store.
    pub fn verifier(&self) -> SettlementVerifier {
        SettlementVerifier::new(self.gateway.clone(), self.orders.clone(), self.currency)
    }
}

impl Default for TestStorefront {
    fn default() -> Self {
        Self::new()
    }
}
