//! Shopper identity rows.
//!
//! Credential verification belongs to the managed identity provider; this
//! table only anchors carts and orders to a stable local ID per email.

use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::User;

/// Repository for shopper identities.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the shopper for this email, creating them on first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_or_create(&self, email: &Email) -> Result<User, RepositoryError> {
        let row: (Uuid, String) = sqlx::query_as(
            r"
            INSERT INTO app_user (email)
            VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET updated_at = now()
            RETURNING id, email
            ",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;

        let email = Email::parse(&row.1).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(row.0),
            email,
        })
    }
}
