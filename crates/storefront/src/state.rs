//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tower_sessions::Session;

use crate::cart::{
    CartBackend, CartEvents, CartService, OwnerLocks, PersistedCartStore, SessionGuestStore,
};
use crate::catalog::ProductCatalog;
use crate::checkout::{CheckoutInitiator, SettlementVerifier};
use crate::config::StorefrontConfig;
use crate::db::{PgCartStore, PgOrderStore, PgProductCatalog};
use crate::models::CurrentShopper;
use crate::orders::OrderStore;
use crate::payments::{PaymentGateway, StripeGateway};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The collaborator seams are
/// held as trait objects so the core stays testable against in-memory
/// implementations; production wiring is Postgres + Stripe.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn ProductCatalog>,
    cart_store: Arc<dyn PersistedCartStore>,
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    events: CartEvents,
    locks: OwnerLocks,
}

impl AppState {
    /// Create production state: Postgres stores and the Stripe gateway.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let catalog = Arc::new(PgProductCatalog::new(pool.clone(), config.currency));
        let cart_store = Arc::new(PgCartStore::new(pool.clone()));
        let orders = Arc::new(PgOrderStore::new(pool.clone()));
        let payments = Arc::new(StripeGateway::new(&config.stripe));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                cart_store,
                orders,
                payments,
                events: CartEvents::new(),
                locks: OwnerLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a handle to the cart change channel.
    #[must_use]
    pub fn events(&self) -> &CartEvents {
        &self.inner.events
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &Arc<dyn OrderStore> {
        &self.inner.orders
    }

    /// Build the cart facade for this request's shopper.
    ///
    /// The backend is chosen once, here: authenticated if the session
    /// carries an identity, guest otherwise. No cart operation re-checks.
    #[must_use]
    pub fn cart_service(
        &self,
        session: &Session,
        shopper: Option<&CurrentShopper>,
    ) -> CartService {
        let guest = Arc::new(SessionGuestStore::new(session.clone()));
        let backend = match shopper {
            Some(shopper) => CartBackend::Authenticated {
                user_id: shopper.id,
                store: self.inner.cart_store.clone(),
                guest,
            },
            None => CartBackend::Guest {
                // Fresh sessions have no ID until first save; they also have
                // no cart yet, so sharing the fallback key is harmless.
                session_key: session
                    .id()
                    .map_or_else(|| "unsaved".to_owned(), |id| id.to_string()),
                store: guest,
            },
        };

        CartService::new(
            backend,
            self.inner.catalog.clone(),
            self.inner.events.clone(),
            self.inner.locks.clone(),
            self.inner.config.currency,
        )
    }

    /// Build the checkout initiator.
    #[must_use]
    pub fn checkout_initiator(&self) -> CheckoutInitiator {
        CheckoutInitiator::new(
            self.inner.payments.clone(),
            self.inner.config.currency,
            self.inner.config.checkout_success_url(),
            self.inner.config.checkout_cancel_url(),
        )
    }

    /// Build the settlement verifier.
    #[must_use]
    pub fn settlement_verifier(&self) -> SettlementVerifier {
        SettlementVerifier::new(
            self.inner.payments.clone(),
            self.inner.orders.clone(),
            self.inner.config.currency,
        )
    }
}
