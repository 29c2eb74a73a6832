//! Magic link validation.

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{Customer, MagicLink};

/// A known, unexpired link and the customer it acts for.
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    /// The stored link. `used` is informational here; submissions reject it.
    pub link: MagicLink,
    /// The customer the link belongs to.
    pub customer: Customer,
}

/// Resolve a token to its customer.
///
/// # Errors
///
/// - `TokenRequired` for a blank token
/// - `TokenInvalid` when no link has this token
/// - `TokenExpired` when `now >= expires_at`
/// - `CustomerNotFound` when the link's customer is gone
#[instrument(skip_all)]
pub async fn validate_token<S: Store>(
    store: &S,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ValidatedToken, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::TokenRequired);
    }

    let link = store
        .find_magic_link(token)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if link.is_expired(now) {
        tracing::info!(customer_id = %link.customer_id, "Expired token presented");
        return Err(AppError::TokenExpired);
    }

    let customer = store.get_customer(link.customer_id).await?.ok_or_else(|| {
        tracing::error!(customer_id = %link.customer_id, "Magic link points at missing customer");
        AppError::CustomerNotFound
    })?;

    Ok(ValidatedToken { link, customer })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxset_core::PackCounts;
    use chrono::Duration;

    use crate::db::TokenStore;
    use crate::models::{CredentialPurpose, NewMagicLink};
    use crate::testing::MemoryStore;

    async fn store_with_link(now: DateTime<Utc>) -> (MemoryStore, MagicLink) {
        let store = MemoryStore::new();
        let customer = store
            .add_customer("fan@example.fr", PackCounts::new(1, 0))
            .await;
        let link = store
            .insert_magic_link(NewMagicLink {
                token: "a".repeat(64),
                customer_id: customer.id,
                purpose: CredentialPurpose::FormatChoice,
                created_at: now,
                expires_at: now + Duration::hours(24),
            })
            .await
            .unwrap();
        (store, link)
    }

    #[tokio::test]
    async fn test_valid_token_resolves_customer() {
        let now = Utc::now();
        let (store, link) = store_with_link(now).await;

        let validated = validate_token(&store, &link.token, now).await.unwrap();
        assert_eq!(validated.customer.id, link.customer_id);
        assert!(!validated.link.used);
    }

    #[tokio::test]
    async fn test_blank_and_unknown_tokens() {
        let now = Utc::now();
        let (store, _) = store_with_link(now).await;

        assert!(matches!(
            validate_token(&store, "   ", now).await,
            Err(AppError::TokenRequired)
        ));
        assert!(matches!(
            validate_token(&store, "nope", now).await,
            Err(AppError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_token_expires_at_its_deadline() {
        let now = Utc::now();
        let (store, link) = store_with_link(now).await;

        let before = link.expires_at - Duration::seconds(1);
        assert!(validate_token(&store, &link.token, before).await.is_ok());
        assert!(matches!(
            validate_token(&store, &link.token, link.expires_at).await,
            Err(AppError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_dangling_link_reports_missing_customer() {
        let now = Utc::now();
        let (store, link) = store_with_link(now).await;
        store.remove_customer(link.customer_id).await;

        assert!(matches!(
            validate_token(&store, &link.token, now).await,
            Err(AppError::CustomerNotFound)
        ));
    }
}
