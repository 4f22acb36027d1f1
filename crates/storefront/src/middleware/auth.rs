//! Shopper identity extraction.
//!
//! Identity is established by the external auth provider and held in the
//! session. These extractors are the only place handlers learn who (if
//! anyone) is signed in.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentShopper, session_keys};

/// Extractor for routes that work for guests and shoppers alike.
pub struct MaybeShopper(pub Option<CurrentShopper>);

/// Extractor for routes that require a signed-in shopper.
pub struct RequireShopper(pub CurrentShopper);

async fn session_from_parts<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Session, AppError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::BadRequest(msg.to_owned()))
}

/// Read the shopper from the session; an unreadable value counts as
/// signed out rather than an error.
pub async fn current_shopper(session: &Session) -> Option<CurrentShopper> {
    match session.get::<CurrentShopper>(session_keys::CURRENT_SHOPPER).await {
        Ok(shopper) => shopper,
        Err(e) => {
            tracing::warn!(error = %e, "session identity unreadable, treating as guest");
            None
        }
    }
}

impl<S> FromRequestParts<S> for MaybeShopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        Ok(Self(current_shopper(&session).await))
    }
}

impl<S> FromRequestParts<S> for RequireShopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        current_shopper(&session).await.map_or_else(
            || Err(AppError::Unauthorized("Please sign in to continue".to_owned())),
            |shopper| Ok(Self(shopper)),
        )
    }
}
