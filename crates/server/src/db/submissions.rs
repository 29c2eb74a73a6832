//! Transactional writes for format choices and refund requests.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use boxset_core::{CustomerId, PostalAddress};

use super::outbox::enqueue_email;
use super::{FormatChoiceCommit, PgStore, RefundCommit, RepositoryError, SubmissionLedger};

/// Mark the link used, failing if another submission got there first.
async fn consume_token(
    conn: &mut PgConnection,
    token: &str,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE boxset.magic_link
        SET used = TRUE, used_at = $2
        WHERE token = $1 AND NOT used
        ",
    )
    .bind(token)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::TokenConsumed);
    }
    Ok(())
}

async fn store_address(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    address: &PostalAddress,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE boxset.customer
        SET address_line1 = $2, address_line2 = $3, postal_code = $4,
            city = $5, country = $6, updated_at = $7
        WHERE id = $1
        ",
    )
    .bind(customer_id)
    .bind(&address.line1)
    .bind(address.line2.as_deref())
    .bind(&address.postal_code)
    .bind(&address.city)
    .bind(&address.country)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

impl SubmissionLedger for PgStore {
    async fn commit_format_choice(
        &self,
        commit: FormatChoiceCommit,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        consume_token(&mut tx, &commit.token, commit.completed_at).await?;
        store_address(&mut tx, commit.customer_id, &commit.address, commit.completed_at).await?;

        sqlx::query("DELETE FROM boxset.format_choice WHERE customer_id = $1")
            .bind(commit.customer_id)
            .execute(&mut *tx)
            .await?;

        for choice in &commit.choices {
            let quantity = i32::try_from(choice.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "quantity out of range: {}",
                    choice.quantity
                ))
            })?;
            sqlx::query(
                r"
                INSERT INTO boxset.format_choice
                    (customer_id, pack_line, format, quantity, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(commit.customer_id)
            .bind(choice.pack_line.as_str())
            .bind(choice.format.as_str())
            .bind(quantity)
            .bind(commit.completed_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r"
            UPDATE boxset.customer
            SET format_choice_completed = TRUE, format_choice_completed_at = $2
            WHERE id = $1
            ",
        )
        .bind(commit.customer_id)
        .bind(commit.completed_at)
        .execute(&mut *tx)
        .await?;

        enqueue_email(&mut tx, &commit.confirmation, commit.completed_at).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_refund(&self, commit: RefundCommit) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        consume_token(&mut tx, &commit.token, commit.requested_at).await?;
        store_address(&mut tx, commit.customer_id, &commit.address, commit.requested_at).await?;

        sqlx::query(
            r"
            UPDATE boxset.customer
            SET iban = $2, bic = $3, refund_amount = $4,
                refund_requested = TRUE, refund_requested_at = $5
            WHERE id = $1
            ",
        )
        .bind(commit.customer_id)
        .bind(commit.iban.as_str())
        .bind(commit.bic.as_str())
        .bind(commit.amount.value())
        .bind(commit.requested_at)
        .execute(&mut *tx)
        .await?;

        enqueue_email(&mut tx, &commit.confirmation, commit.requested_at).await?;

        tx.commit().await?;
        Ok(())
    }
}
