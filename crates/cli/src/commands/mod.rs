//! CLI subcommand implementations.

pub mod customer;
pub mod migrate;
pub mod outbox;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use boxset_server::db::{RepositoryError, create_pool};

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Ledger operation failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] boxset_core::EmailError),
}

/// Connect using `BOXSET_DATABASE_URL`, falling back to `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BOXSET_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("BOXSET_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&SecretString::from(database_url)).await?)
}
