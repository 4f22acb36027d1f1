//! Session-related types.
//!
//! Types stored in the session: the shopper's identity (set after the auth
//! provider verifies them) and the guest cart slot.

use serde::{Deserialize, Serialize};

use atelier_core::{Email, UserId};

/// Session-stored shopper identity.
///
/// Present only after sign-in; its absence marks the shopper as a guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentShopper {
    /// Shopper's database ID.
    pub id: UserId,
    /// Shopper's email address.
    pub email: Email,
}

/// Session keys for storefront data.
pub mod session_keys {
    /// Key for storing the signed-in shopper.
    pub const CURRENT_SHOPPER: &str = "current_shopper";

    /// Key for the guest cart slot: the whole line collection as one value.
    pub const GUEST_CART: &str = "guest_cart";
}
