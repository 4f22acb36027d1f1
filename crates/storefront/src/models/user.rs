//! Shopper identity domain type.

use atelier_core::{Email, UserId};

/// A shopper known to the storefront.
///
/// Identity is established by the external auth provider; locally a shopper
/// is just a stable ID for their email, anchoring carts and orders.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
}
