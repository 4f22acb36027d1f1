//! Checkout: session initiation and payment settlement.
//!
//! [`initiator::CheckoutInitiator`] turns the current cart snapshot into a
//! hosted payment session and hands back a redirect URL - nothing else.
//! [`verifier::SettlementVerifier`] runs when the shopper returns, confirms
//! the outcome with the provider, and performs the one-time transition from
//! cart to durable order.

pub mod initiator;
pub mod verifier;

pub use initiator::{CheckoutDetails, CheckoutError, CheckoutInitiator, CustomerDetails, ShippingMethod};
pub use verifier::{SettlementOutcome, SettlementVerifier};

/// Display name of the synthetic shipping line item.
///
/// The initiator appends it to the provider session; the verifier folds it
/// back into the order's `shipping_cost` instead of storing it as an item.
pub(crate) const SHIPPING_LINE_NAME: &str = "Shipping";

/// Metadata keys round-tripped through the provider session.
pub(crate) mod metadata_keys {
    /// The shopper the session was created for.
    pub const USER_ID: &str = "user_id";
    /// Validated shipping address, JSON-encoded.
    pub const SHIPPING_ADDRESS: &str = "shipping_address";
    /// Shipping cost in minor units.
    pub const SHIPPING_COST_MINOR: &str = "shipping_cost_minor";
}
