//! Confirmation email outbox inspection.

use boxset_server::db::PgStore;

use super::{CommandError, connect};

/// Log how many outbox entries are in each state.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn status() -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);
    let counts = store.outbox_status_counts().await?;

    tracing::info!("Outbox:");
    tracing::info!("  pending: {}", counts.pending);
    tracing::info!("  sent:    {}", counts.sent);
    tracing::info!("  failed:  {}", counts.failed);
    if counts.failed > 0 {
        tracing::warn!(
            "{} confirmation email(s) were abandoned; see boxset.email_outbox.last_error",
            counts.failed
        );
    }
    Ok(())
}
