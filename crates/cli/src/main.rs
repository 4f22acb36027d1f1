//! Atelier CLI - migrations and management.
//!
//! The storefront never migrates on startup; schema changes are applied
//! deliberately from here:
//!
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Parser)]
#[command(name = "atelier-cli", about = "Atelier management tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply storefront migrations (including the session table).
    Migrate,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("STOREFRONT_DATABASE_URL or DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<SecretString, CliError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingDatabaseUrl)
}

async fn migrate() -> Result<(), CliError> {
    let pool = atelier_storefront::db::create_pool(&database_url()?).await?;

    tracing::info!("applying storefront migrations");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("applying session store migration");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("migrations complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_cli=info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => migrate().await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
