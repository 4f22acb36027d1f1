//! Payment provider seam.
//!
//! The provider hosts the checkout page and is the sole source of truth for
//! "did payment succeed". The core talks to it through two calls: create a
//! session from a cart snapshot, and retrieve a session's authoritative
//! outcome. [`stripe::StripeGateway`] is the production implementation.

pub mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use atelier_core::CurrencyCode;

pub use self::stripe::StripeGateway;

/// Result type alias for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-provider errors.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider rejected or failed the request.
    #[error("payment provider error: {0}")]
    Provider(String),

    /// The referenced session does not exist (or has expired provider-side).
    #[error("payment session not found: {0}")]
    SessionNotFound(String),

    /// The provider response was missing something we require.
    #[error("payment provider response invalid: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// Whether retrying the same call might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    /// Message safe to show a shopper.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Provider(_) | Self::InvalidResponse(_) => {
                "Payment processing failed. Please try again."
            }
            Self::SessionNotFound(_) => "This payment session has expired.",
        }
    }
}

/// One line item of a session request: display data plus the unit price in
/// minor units, captured at the instant the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
    pub image_url: Option<String>,
}

/// Request to create a hosted checkout session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub currency: CurrencyCode,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque pass-through the verifier reads back (user ID, shipping
    /// snapshot, shipping cost).
    pub metadata: HashMap<String, String>,
}

/// A freshly created session: the handle plus the redirect URL, nothing
/// else - creating a session mutates no local state.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Authoritative payment outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// A line item as captured by the provider at session creation.
#[derive(Debug, Clone)]
pub struct CapturedLineItem {
    pub description: String,
    pub unit_amount: i64,
    pub quantity: u32,
    pub amount_total: i64,
}

/// A session's state as reported by the provider.
#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub session_id: String,
    pub outcome: PaymentOutcome,
    pub amount_total: i64,
    pub currency: Option<CurrencyCode>,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
    pub line_items: Vec<CapturedLineItem>,
}

/// The two calls the core makes against the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its redirect handle.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the provider rejects the request.
    async fn create_session(&self, request: &SessionRequest) -> Result<CreatedSession>;

    /// Retrieve a session's authoritative status and captured line items.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::SessionNotFound`] for unknown or expired
    /// sessions, [`PaymentError`] otherwise.
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails>;
}
