//! Magic link storage.

use chrono::{DateTime, Utc};

use boxset_core::{CustomerId, MagicLinkId};

use super::{PgStore, RepositoryError, TokenStore};
use crate::models::{CredentialPurpose, MagicLink, NewMagicLink};

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct MagicLinkRow {
    id: i32,
    token: String,
    customer_id: i32,
    purpose: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    used: bool,
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<MagicLinkRow> for MagicLink {
    type Error = RepositoryError;

    fn try_from(row: MagicLinkRow) -> Result<Self, Self::Error> {
        let purpose: CredentialPurpose = row
            .purpose
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("magic_link purpose: {e}")))?;

        Ok(Self {
            id: MagicLinkId::new(row.id),
            token: row.token,
            customer_id: CustomerId::new(row.customer_id),
            purpose,
            created_at: row.created_at,
            expires_at: row.expires_at,
            used: row.used,
            used_at: row.used_at,
        })
    }
}

impl TokenStore for PgStore {
    async fn insert_magic_link(&self, link: NewMagicLink) -> Result<MagicLink, RepositoryError> {
        let row = sqlx::query_as::<_, MagicLinkRow>(
            r"
            INSERT INTO boxset.magic_link (token, customer_id, purpose, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, token, customer_id, purpose, created_at, expires_at, used, used_at
            ",
        )
        .bind(&link.token)
        .bind(link.customer_id)
        .bind(link.purpose.as_str())
        .bind(link.created_at)
        .bind(link.expires_at)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn find_magic_link(&self, token: &str) -> Result<Option<MagicLink>, RepositoryError> {
        let row = sqlx::query_as::<_, MagicLinkRow>(
            r"
            SELECT id, token, customer_id, purpose, created_at, expires_at, used, used_at
            FROM boxset.magic_link
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
