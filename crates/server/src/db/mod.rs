//! Persistence for the self-service workflow.
//!
//! # Schema: `boxset`
//!
//! ## Tables
//!
//! - `customer` - Customer ledger: packs bought, address, bank details, flags
//! - `magic_link` - Issued credentials with expiry and used flag
//! - `format_choice` - Latest accepted format split per customer
//! - `email_outbox` - Confirmation emails awaiting delivery
//!
//! # Seams
//!
//! Handlers never touch a pool directly. They go through the traits below,
//! implemented by [`PgStore`] in production and by
//! [`crate::testing::MemoryStore`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p boxset-cli -- migrate
//! ```

pub mod customers;
pub mod magic_links;
pub mod outbox;
pub mod submissions;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use boxset_core::{Amount, Bic, CustomerId, Email, FormatChoice, Iban, PostalAddress};

use crate::models::{Customer, MagicLink, NewMagicLink, OutboxEmail, OutgoingEmail};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The magic link was already consumed (or vanished) when the submission
    /// tried to consume it. Nothing was written.
    #[error("magic link already consumed")]
    TokenConsumed,
}

/// Read access to customers and their stored format choices.
pub trait CustomerLedger: Send + Sync {
    /// Look up a customer by exact (normalized) email.
    fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Look up a customer by ID.
    fn get_customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Current format choice rows for a customer.
    fn list_format_choices(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Vec<FormatChoice>, RepositoryError>> + Send;

    /// Every customer with at least one pack on any line.
    fn list_customers_with_packs(
        &self,
    ) -> impl Future<Output = Result<Vec<Customer>, RepositoryError>> + Send;

    /// Check the backing store answers.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Storage of issued magic links.
pub trait TokenStore: Send + Sync {
    /// Persist a new, unused link.
    fn insert_magic_link(
        &self,
        link: NewMagicLink,
    ) -> impl Future<Output = Result<MagicLink, RepositoryError>> + Send;

    /// Look up a link by its token.
    fn find_magic_link(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<MagicLink>, RepositoryError>> + Send;
}

/// An accepted format choice, written atomically.
#[derive(Debug, Clone)]
pub struct FormatChoiceCommit {
    /// Customer the choice belongs to.
    pub customer_id: CustomerId,
    /// Token to consume.
    pub token: String,
    /// Validated delivery address.
    pub address: PostalAddress,
    /// Rows replacing every existing choice of the customer.
    pub choices: Vec<FormatChoice>,
    /// Commit instant.
    pub completed_at: DateTime<Utc>,
    /// Confirmation to enqueue in the outbox.
    pub confirmation: OutgoingEmail,
}

/// An accepted refund request, written atomically.
#[derive(Debug, Clone)]
pub struct RefundCommit {
    /// Customer requesting the refund.
    pub customer_id: CustomerId,
    /// Token to consume.
    pub token: String,
    /// Validated postal address.
    pub address: PostalAddress,
    /// Normalized IBAN.
    pub iban: Iban,
    /// Normalized BIC.
    pub bic: Bic,
    /// Amount owed.
    pub amount: Amount,
    /// Commit instant.
    pub requested_at: DateTime<Utc>,
    /// Confirmation to enqueue in the outbox.
    pub confirmation: OutgoingEmail,
}

/// Transactional writes of the two submission flows.
///
/// Each commit updates the customer, consumes the token and enqueues the
/// confirmation email in one transaction. If the token is no longer unused
/// the whole commit is rolled back with [`RepositoryError::TokenConsumed`].
pub trait SubmissionLedger: Send + Sync {
    /// Replace format choices, store the address, mark the flow completed.
    fn commit_format_choice(
        &self,
        commit: FormatChoiceCommit,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Store address, bank details and refund amount, mark refund requested.
    fn commit_refund(
        &self,
        commit: RefundCommit,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Delivery bookkeeping for queued confirmation emails.
pub trait EmailOutbox: Send + Sync {
    /// Oldest pending entries, at most `limit`.
    fn pending_emails(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<OutboxEmail>, RepositoryError>> + Send;

    /// Record a successful delivery.
    fn mark_email_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Record a failed attempt; `give_up` moves the entry to `failed`.
    fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        give_up: bool,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: CustomerLedger + TokenStore + SubmissionLedger + EmailOutbox + 'static {}

impl<T> Store for T where
    T: CustomerLedger + TokenStore + SubmissionLedger + EmailOutbox + 'static
{
}

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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
