//! Checkout session initiation.
//!
//! Validates the shopper's details, captures the cart snapshot as provider
//! line items, and asks the payment gateway for a hosted session. Performs
//! no catalog, inventory, or cart mutation - its only output is a redirect
//! URL. Every invocation creates a brand-new provider session; abandoned
//! sessions never settle and expire on the provider's side.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::{CurrencyCode, Email, Price};

use super::{SHIPPING_LINE_NAME, metadata_keys};
use crate::cart::CartError;
use crate::models::{Address, CartSnapshot, CurrentShopper};
use crate::payments::{CreatedSession, PaymentError, PaymentGateway, SessionLineItem, SessionRequest};

/// Shopper-entered contact details.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Shipping options offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    /// 5-7 business days, free.
    #[default]
    Standard,
    /// 2-3 business days.
    Express,
    /// Next business day.
    Overnight,
}

impl ShippingMethod {
    /// Flat shipping cost in the store currency.
    #[must_use]
    pub fn cost(self, currency: CurrencyCode) -> Price {
        let amount = match self {
            Self::Standard => Decimal::ZERO,
            Self::Express => Decimal::from(15),
            Self::Overnight => Decimal::from(35),
        };
        Price::new(amount, currency)
    }
}

/// Everything the shopper submits to start a checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutDetails {
    pub customer: CustomerDetails,
    pub shipping_address: Address,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
}

/// Checkout failures.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Required fields are missing or unusable. No side effect happened;
    /// the shopper corrects and resubmits.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// Checkout needs a non-empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Cart state could not be read.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The payment provider rejected the session request.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Builds payment sessions from cart snapshots.
pub struct CheckoutInitiator {
    gateway: Arc<dyn PaymentGateway>,
    currency: CurrencyCode,
    success_url: String,
    cancel_url: String,
}

impl CheckoutInitiator {
    #[must_use]
    pub const fn new(
        gateway: Arc<dyn PaymentGateway>,
        currency: CurrencyCode,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            gateway,
            currency,
            success_url,
            cancel_url,
        }
    }

    /// Validate and create a payment session for the current cart.
    ///
    /// On success returns the provider session handle and redirect URL; the
    /// cart itself is left untouched until settlement clears it.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] or [`CheckoutError::EmptyCart`]
    /// without any side effect, [`CheckoutError::Payment`] if the provider
    /// rejects the request.
    pub async fn start(
        &self,
        shopper: &CurrentShopper,
        snapshot: &CartSnapshot,
        details: &CheckoutDetails,
    ) -> Result<CreatedSession, CheckoutError> {
        let email = validate(snapshot, details)?;

        // Unit prices enter the session at this instant; from here on the
        // provider's captured copy is authoritative for this attempt.
        let mut line_items: Vec<SessionLineItem> = snapshot
            .items
            .iter()
            .map(|item| {
                let name = match item.line.variant.label() {
                    Some(label) => format!("{} ({label})", item.product.name),
                    None => item.product.name.clone(),
                };
                SessionLineItem {
                    name,
                    unit_amount: item.product.unit_price.to_minor_units(),
                    quantity: item.line.quantity,
                    image_url: item.product.image_url.clone(),
                }
            })
            .collect();

        let shipping_cost = details.shipping_method.cost(self.currency);
        if shipping_cost.to_minor_units() > 0 {
            line_items.push(SessionLineItem {
                name: SHIPPING_LINE_NAME.to_owned(),
                unit_amount: shipping_cost.to_minor_units(),
                quantity: 1,
                image_url: None,
            });
        }

        let mut metadata = HashMap::new();
        metadata.insert(metadata_keys::USER_ID.to_owned(), shopper.id.to_string());
        metadata.insert(
            metadata_keys::SHIPPING_COST_MINOR.to_owned(),
            shipping_cost.to_minor_units().to_string(),
        );
        if let Ok(address) = serde_json::to_string(&details.shipping_address) {
            metadata.insert(metadata_keys::SHIPPING_ADDRESS.to_owned(), address);
        }

        let request = SessionRequest {
            line_items,
            currency: self.currency,
            customer_email: email.to_string(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            metadata,
        };

        let session = self.gateway.create_session(&request).await?;
        tracing::info!(
            shopper = %shopper.id,
            session_id = %session.session_id,
            "checkout session created"
        );
        Ok(session)
    }
}

/// Check required fields, reporting every missing one at once.
fn validate(snapshot: &CartSnapshot, details: &CheckoutDetails) -> Result<Email, CheckoutError> {
    let mut missing = Vec::new();

    let email = Email::parse(&details.customer.email);
    if email.is_err() {
        missing.push("email");
    }
    if details.customer.first_name.trim().is_empty() {
        missing.push("first_name");
    }
    if details.customer.last_name.trim().is_empty() {
        missing.push("last_name");
    }
    if details.shipping_address.line1.trim().is_empty() {
        missing.push("shipping_address.line1");
    }
    if details.shipping_address.city.trim().is_empty() {
        missing.push("shipping_address.city");
    }
    if details.shipping_address.postal_code.trim().is_empty() {
        missing.push("shipping_address.postal_code");
    }
    if details.shipping_address.country.trim().is_empty() {
        missing.push("shipping_address.country");
    }

    if !missing.is_empty() {
        return Err(CheckoutError::Validation { missing });
    }
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    #[allow(clippy::unwrap_used)] // checked above
    Ok(email.unwrap())
}
