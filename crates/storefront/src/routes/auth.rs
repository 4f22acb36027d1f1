//! Sign-in/sign-out session endpoints.
//!
//! Credential verification is the managed identity provider's job; these
//! endpoints establish (or drop) the server session from a
//! provider-verified email, and kick off the one-time guest cart merge.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::{Email, UserId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{CurrentShopper, session_keys};
use crate::state::AppState;

/// Sign-in request: the identity the auth provider verified.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

/// The established identity.
#[derive(Serialize)]
pub struct ShopperView {
    pub user_id: UserId,
    pub email: String,
}

/// Establish the session for a verified shopper and reconcile their cart.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignInRequest>,
) -> Result<Json<ShopperView>> {
    let email = Email::parse(&form.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let user = UserRepository::new(state.pool()).get_or_create(&email).await?;

    let shopper = CurrentShopper {
        id: user.id,
        email: user.email.clone(),
    };
    session
        .insert(session_keys::CURRENT_SHOPPER, &shopper)
        .await?;

    // The guest -> authenticated transition happens here, exactly once per
    // login. Cart reads double-check behind the same guard in case this
    // pass is interrupted.
    let cart = state.cart_service(&session, Some(&shopper));
    let report = cart.reconcile().await;
    tracing::info!(
        user_id = %user.id,
        applied = report.applied,
        failed = report.failed,
        "sign-in reconciliation finished"
    );

    Ok(Json(ShopperView {
        user_id: user.id,
        email: user.email.to_string(),
    }))
}

/// Drop the shopper's identity from the session.
///
/// The merged cart stays in the persisted store; a new anonymous session
/// starts with an empty guest cart - the transition never reverses.
#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> Result<StatusCode> {
    session
        .remove::<CurrentShopper>(session_keys::CURRENT_SHOPPER)
        .await?;
    session.cycle_id().await?;
    Ok(StatusCode::NO_CONTENT)
}
