//! Cart domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::{CartLineId, Price, ProductId, VariantSelection};

use super::product::ProductSummary;

/// One distinct purchasable configuration in a cart.
///
/// Within one cart there is at most one line per `(product_id, variant)`
/// pair; adding the same configuration again increments the quantity instead
/// of creating a second line. Quantity is always >= 1 - a line driven to
/// zero is deleted, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub variant: VariantSelection,
}

impl CartLine {
    /// Create a line with a locally generated ID (guest carts).
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, variant: VariantSelection) -> Self {
        Self {
            id: CartLineId::generate(),
            product_id,
            quantity,
            variant,
        }
    }

    /// Whether this line holds the given configuration.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, variant: &VariantSelection) -> bool {
        self.product_id == product_id && &self.variant == variant
    }
}

/// A cart line joined with its product's live catalog data.
///
/// The product details (name, unit price, image) are read at snapshot time,
/// not frozen at add time - an open cart reflects price changes until an
/// order freezes them.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub line: CartLine,
    pub product: ProductSummary,
}

impl CartItem {
    /// `unit_price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::new(
            self.product.unit_price.amount * Decimal::from(self.line.quantity),
            self.product.unit_price.currency,
        )
    }
}

/// Point-in-time view of a cart: priced items plus derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub subtotal: Price,
    pub count: u32,
}

impl CartSnapshot {
    /// Build a snapshot, deriving subtotal and count from the items.
    #[must_use]
    pub fn new(items: Vec<CartItem>, currency: atelier_core::CurrencyCode) -> Self {
        let subtotal = items
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc + item.line_total().amount);
        let count = items.iter().map(|item| item.line.quantity).sum();
        Self {
            items,
            subtotal: Price::new(subtotal, currency),
            count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
