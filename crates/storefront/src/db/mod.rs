//! Database operations for the storefront `PostgreSQL` instance.
//!
//! ## Tables
//!
//! - `app_user` - Shopper identities established by the auth provider
//! - `product` - The slice of the catalog the cart core reads
//! - `cart_item` - Persisted per-user cart lines
//! - `orders` / `order_item` - Durable order snapshots from settlement
//! - `session` - Tower-sessions storage (created by the session store)
//!
//! Queries use sqlx's runtime API; row structs derive `FromRow`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```
//! They are never run automatically on startup.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod cart;
mod orders;
mod products;
mod users;

pub use cart::PgCartStore;
pub use orders::PgOrderStore;
pub use products::PgProductCatalog;
pub use users::UserRepository;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Query failed at the database layer. Callers may retry.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data failed to parse back into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a sqlx error, converting unique violations to [`Self::Conflict`].
    pub(crate) fn from_write(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}
