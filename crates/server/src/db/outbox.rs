//! Email outbox storage.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use boxset_core::Email;

use super::{EmailOutbox, PgStore, RepositoryError};
use crate::models::{OutboxEmail, OutboxStatus, OutgoingEmail};

/// Internal row type for pending entries.
#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    recipient: String,
    recipient_name: Option<String>,
    subject: String,
    text_body: String,
    html_body: String,
    attempts: i32,
}

impl TryFrom<OutboxRow> for OutboxEmail {
    type Error = RepositoryError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let to = Email::parse(&row.recipient).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid outbox recipient: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            message: OutgoingEmail {
                to,
                to_name: row.recipient_name,
                subject: row.subject,
                text_body: row.text_body,
                html_body: row.html_body,
            },
            attempts: row.attempts,
        })
    }
}

/// Insert a pending entry inside the caller's transaction.
pub(super) async fn enqueue_email(
    conn: &mut PgConnection,
    email: &OutgoingEmail,
    at: DateTime<Utc>,
) -> Result<Uuid, RepositoryError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r"
        INSERT INTO boxset.email_outbox
            (id, recipient, recipient_name, subject, text_body, html_body, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(id)
    .bind(&email.to)
    .bind(email.to_name.as_deref())
    .bind(&email.subject)
    .bind(&email.text_body)
    .bind(&email.html_body)
    .bind(OutboxStatus::Pending.as_str())
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

impl EmailOutbox for PgStore {
    async fn pending_emails(&self, limit: i64) -> Result<Vec<OutboxEmail>, RepositoryError> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r"
            SELECT id, recipient, recipient_name, subject, text_body, html_body, attempts
            FROM boxset.email_outbox
            WHERE status = $1
            ORDER BY created_at
            LIMIT $2
            ",
        )
        .bind(OutboxStatus::Pending.as_str())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_email_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE boxset.email_outbox
            SET status = $2, sent_at = $3, attempts = attempts + 1, last_error = NULL
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(OutboxStatus::Sent.as_str())
        .bind(sent_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        give_up: bool,
    ) -> Result<(), RepositoryError> {
        let status = if give_up {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        };

        sqlx::query(
            r"
            UPDATE boxset.email_outbox
            SET status = $2, attempts = attempts + 1, last_error = $3
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

/// Entry counts per delivery status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxCounts {
    /// Waiting for delivery.
    pub pending: i64,
    /// Delivered.
    pub sent: i64,
    /// Abandoned after too many attempts.
    pub failed: i64,
}

impl PgStore {
    /// Count outbox entries by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn outbox_status_counts(&self) -> Result<OutboxCounts, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM boxset.email_outbox GROUP BY status",
        )
        .fetch_all(self.pool())
        .await?;

        let mut counts = OutboxCounts::default();
        for (status, count) in rows {
            let status: OutboxStatus = status
                .parse()
                .map_err(|e| RepositoryError::DataCorruption(format!("outbox status: {e}")))?;
            match status {
                OutboxStatus::Pending => counts.pending = count,
                OutboxStatus::Sent => counts.sent = count,
                OutboxStatus::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }
}
