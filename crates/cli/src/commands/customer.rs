//! Customer ledger management.
//!
//! # Usage
//!
//! ```bash
//! boxset-cli customer add -e fan@example.fr --first-name Jeanne --melancolie 2
//! ```

use boxset_core::{Email, PackCounts};
use boxset_server::db::PgStore;
use boxset_server::models::NewCustomer;

use super::{CommandError, connect};

/// Register a buyer in the ledger.
///
/// # Errors
///
/// Returns an error if the email is invalid or the insert fails.
pub async fn add(
    email: &str,
    first_name: Option<String>,
    last_name: Option<String>,
    packs: PackCounts,
) -> Result<(), CommandError> {
    let email = Email::normalize(email)?;
    if !packs.has_any() {
        tracing::warn!("Customer has no packs and will be refused magic links");
    }

    let store = PgStore::new(connect().await?);
    let customer = store
        .insert_customer(NewCustomer {
            email,
            first_name,
            last_name,
            packs,
        })
        .await?;

    tracing::info!(
        "Customer created: ID {}, {} (melancolie: {}, symphonie: {})",
        customer.id,
        customer.email,
        customer.packs.melancolie,
        customer.packs.symphonie
    );
    Ok(())
}
