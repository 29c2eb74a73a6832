//! Background delivery of confirmation emails.
//!
//! Submissions write their confirmation into the outbox inside the same
//! transaction as the data, then wake the dispatcher. The dispatcher also
//! polls on a fixed interval so entries left behind by a restart or a failed
//! attempt are picked up. Each entry gets at most `outbox_max_attempts`
//! delivery attempts; after that it is marked failed and left for operators.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::db::{RepositoryError, Store};
use crate::services::email::Mailer;
use crate::state::AppState;

/// Outcome of one dispatcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Entries delivered.
    pub sent: usize,
    /// Entries that failed and will be retried.
    pub failed: usize,
    /// Entries that failed for the last allowed time.
    pub abandoned: usize,
}

/// Delivers pending outbox entries through the state's mailer.
pub struct OutboxDispatcher<S, M> {
    state: AppState<S, M>,
    poll_interval: Duration,
}

impl<S: Store, M: Mailer> OutboxDispatcher<S, M> {
    /// Create a dispatcher polling every `poll_interval`.
    #[must_use]
    pub const fn new(state: AppState<S, M>, poll_interval: Duration) -> Self {
        Self {
            state,
            poll_interval,
        }
    }

    /// Attempt delivery of one batch of pending entries.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the outbox cannot be read or updated.
    /// Delivery failures are recorded on the entry, not returned.
    #[instrument(skip_all)]
    pub async fn dispatch_pending(&self) -> Result<DispatchSummary, RepositoryError> {
        let settings = self.state.settings();
        let store = self.state.store();
        let pending = store.pending_emails(settings.outbox_batch_size).await?;
        let mut summary = DispatchSummary::default();

        for entry in pending {
            match self.state.mailer().send(&entry.message).await {
                Ok(()) => {
                    store.mark_email_sent(entry.id, Utc::now()).await?;
                    summary.sent += 1;
                }
                Err(e) => {
                    let give_up = entry.attempts + 1 >= settings.outbox_max_attempts;
                    store.mark_email_failed(entry.id, &e.to_string(), give_up).await?;
                    if give_up {
                        error!(
                            outbox_id = %entry.id,
                            attempts = entry.attempts + 1,
                            error = %e,
                            "Confirmation email abandoned"
                        );
                        summary.abandoned += 1;
                    } else {
                        warn!(
                            outbox_id = %entry.id,
                            error = %e,
                            "Confirmation email failed, will retry"
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        if summary != DispatchSummary::default() {
            debug!(?summary, "Outbox pass complete");
        }
        Ok(summary)
    }

    /// Run until `shutdown` fires, waking on commits and on the poll interval.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!(
            poll_secs = self.poll_interval.as_secs(),
            "Outbox dispatcher started"
        );

        loop {
            if let Err(e) = self.dispatch_pending().await {
                error!(error = %e, "Outbox pass failed");
            }

            tokio::select! {
                _ = &mut shutdown => break,
                () = self.state.outbox_signal().notified() => {},
                () = tokio::time::sleep(self.poll_interval) => {},
            }
        }

        info!("Outbox dispatcher stopped");
    }

    /// Spawn [`Self::run`] on the runtime.
    pub fn spawn(self, shutdown: oneshot::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
