//! Postgres-backed persisted cart store.
//!
//! Each mutation is a single statement; cross-line invariants (one line per
//! product configuration) are the facade's job, so the table carries no
//! uniqueness over `(user_id, product_id, size, color)`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{CartLineId, ProductId, UserId, VariantSelection};

use super::RepositoryError;
use crate::cart::PersistedCartStore;
use crate::models::CartLine;

/// Persisted cart rows in the `cart_item` table.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity: u32::try_from(row.quantity).unwrap_or(1),
            variant: VariantSelection::new(row.size, row.color),
        }
    }
}

#[async_trait]
impl PersistedCartStore for PgCartStore {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT id, product_id, quantity, size, color
            FROM cart_item
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn insert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        variant: &VariantSelection,
    ) -> Result<CartLine, RepositoryError> {
        let row: CartLineRow = sqlx::query_as(
            r"
            INSERT INTO cart_item (user_id, product_id, quantity, size, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, quantity, size, color
            ",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .bind(&variant.size)
        .bind(&variant.color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart line"))?;

        Ok(row.into())
    }

    async fn update_quantity(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_item
            SET quantity = $1
            WHERE id = $2
            ",
        )
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .bind(line_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, line_id: CartLineId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_item WHERE id = $1")
            .bind(line_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
