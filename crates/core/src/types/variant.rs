//! Product variant selection.

use serde::{Deserialize, Serialize};

/// The size/color configuration a shopper picked for a product.
///
/// Together with the product ID this identifies a distinct cart line: two
/// lines for the same product with different selections are never merged.
/// Both fields are optional because not every product is sized or colored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct VariantSelection {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl VariantSelection {
    /// A selection with neither size nor color.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            size: None,
            color: None,
        }
    }

    /// Build a selection, treating empty strings as absent.
    #[must_use]
    pub fn new(size: Option<String>, color: Option<String>) -> Self {
        let clean = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            size: clean(size),
            color: clean(color),
        }
    }

    /// Whether any attribute is selected.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.size.is_some() || self.color.is_some()
    }

    /// Human-readable label, e.g. `M / Indigo`, for display names and
    /// payment line items.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => Some(format!("{size} / {color}")),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }
}
