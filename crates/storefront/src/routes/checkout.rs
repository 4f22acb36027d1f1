//! Checkout route handlers.
//!
//! `create` hands the shopper a provider redirect URL; `verify` runs when
//! they return from the provider and reports the settlement outcome for
//! the verifying/success/error screen.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::checkout::{CheckoutDetails, SettlementOutcome};
use crate::error::Result;
use crate::middleware::{MaybeShopper, RequireShopper};
use crate::state::AppState;

/// Response to a checkout start: where to send the shopper.
#[derive(Serialize)]
pub struct CheckoutStarted {
    pub url: String,
    pub session_id: String,
}

/// Query string carried back from the payment provider.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub session_id: Option<String>,
}

/// Settlement result for the payment-success screen.
#[derive(Serialize)]
pub struct VerifyResponse {
    /// `settled` or `failed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validate the submitted details and create a payment session.
///
/// The cart is left untouched; only settlement clears it.
#[instrument(skip(state, session, shopper, details))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireShopper(shopper): RequireShopper,
    Json(details): Json<CheckoutDetails>,
) -> Result<Json<CheckoutStarted>> {
    let cart = state.cart_service(&session, Some(&shopper));
    let snapshot = cart.snapshot().await?;

    let created = state
        .checkout_initiator()
        .start(&shopper, &snapshot, &details)
        .await?;

    Ok(Json(CheckoutStarted {
        url: created.redirect_url,
        session_id: created.session_id,
    }))
}

/// Confirm a payment session's outcome after the provider redirects back.
#[instrument(skip(state, session, shopper))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    MaybeShopper(shopper): MaybeShopper,
    Query(params): Query<VerifyParams>,
) -> Json<VerifyResponse> {
    let Some(session_id) = params.session_id else {
        return Json(VerifyResponse {
            status: "failed",
            order_number: None,
            error: Some("No session ID found".to_owned()),
        });
    };

    let cart = state.cart_service(&session, shopper.as_ref());
    let outcome = state.settlement_verifier().verify(&session_id, &cart).await;

    Json(match outcome {
        SettlementOutcome::Settled { order_number } => VerifyResponse {
            status: "settled",
            order_number: Some(order_number.to_string()),
            error: None,
        },
        SettlementOutcome::Failed { reason } => VerifyResponse {
            status: "failed",
            order_number: None,
            error: Some(reason),
        },
    })
}
