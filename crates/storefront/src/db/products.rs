//! Postgres-backed product catalog reads.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{CurrencyCode, Price, ProductId};

use super::RepositoryError;
use crate::catalog::ProductCatalog;
use crate::models::ProductSummary;

/// Live catalog reads from the `product` table.
///
/// Prices are stored as plain decimals in the store currency; the currency
/// is configuration, not data.
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
    currency: CurrencyCode,
}

impl PgProductCatalog {
    #[must_use]
    pub const fn new(pool: PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    price: Decimal,
    image_url: Option<String>,
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, name, slug, price, image_url
            FROM product
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSummary {
                id: ProductId::new(row.id),
                name: row.name,
                slug: row.slug,
                unit_price: Price::new(row.price, self.currency),
                image_url: row.image_url,
            })
            .collect())
    }
}
