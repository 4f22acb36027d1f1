//! Catalog read model.

use serde::Serialize;

use atelier_core::{Price, ProductId};

/// The slice of a catalog product the cart core needs.
///
/// Read live per snapshot; the core never writes to the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub unit_price: Price,
    pub image_url: Option<String>,
}
