//! Database migration commands.
//!
//! The storefront keeps nothing in `PostgreSQL` but visitor sessions, so the
//! only schema is the session store's own table.
//!
//! # Usage
//!
//! ```bash
//! souq-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use souq_storefront::config::{ConfigError, database_url_from_env};
use souq_storefront::db;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Migration failures.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the session table and its schema if missing.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the migration fails.
pub async fn sessions() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session migrations complete!");
    Ok(())
}
