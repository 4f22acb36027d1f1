//! JSON route surface consumed by the SPA.
//!
//! Thin handlers only: every one builds the cart facade (or checkout
//! component) from request state and delegates. No business rules live
//! here.

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;

/// All storefront API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/session", post(auth::sign_in).delete(auth::sign_out))
        .route("/api/cart", get(cart::show).delete(cart::clear))
        .route("/api/cart/items", post(cart::add))
        .route(
            "/api/cart/items/{line_id}",
            put(cart::update).delete(cart::remove),
        )
        .route("/api/cart/count", get(cart::count))
        .route("/api/cart/events", get(cart::events))
        .route("/api/checkout", post(checkout::create))
        .route("/api/checkout/verify", get(checkout::verify))
        .route("/api/orders", get(orders::list))
}
