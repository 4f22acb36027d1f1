//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. Route handlers return `Result<T, AppError>`;
//! the response body is always JSON so the SPA can render it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::db::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session read/write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Session(_) => true,
            Self::Cart(e) | Self::Checkout(CheckoutError::Cart(e)) => e.is_retryable(),
            Self::Checkout(CheckoutError::Payment(_)) => true,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = match &self {
            Self::Cart(CartError::Unavailable(_))
            | Self::Checkout(CheckoutError::Cart(CartError::Unavailable(_))) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "Cart temporarily unavailable, please retry",
                    "retryable": true,
                }),
            ),
            Self::Cart(CartError::LineNotFound)
            | Self::Checkout(CheckoutError::Cart(CartError::LineNotFound)) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Cart line not found" }),
            ),
            Self::Checkout(CheckoutError::Validation { missing }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "Missing required fields",
                    "missing": missing,
                }),
            ),
            Self::Checkout(CheckoutError::EmptyCart) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Your cart is empty" }),
            ),
            Self::Checkout(CheckoutError::Payment(e)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": e.user_message() }),
            ),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
