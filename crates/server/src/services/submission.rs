//! Format choice and refund request flows.
//!
//! Both flows validate the token, reject it if a previous submission already
//! consumed it, validate the payload, then hand a single commit to the
//! store. The commit writes the customer, consumes the token and enqueues the
//! confirmation email atomically; the outbox dispatcher is woken afterwards.

use chrono::{DateTime, Utc};
use tracing::instrument;

use boxset_core::{Allocation, BankDetails, PostalAddress, validate_allocation};

use crate::db::{FormatChoiceCommit, RefundCommit, Store};
use crate::error::AppError;
use crate::services::email::{Mailer, templates};
use crate::services::token::{ValidatedToken, validate_token};
use crate::state::AppState;

/// A format choice as submitted by the customer.
#[derive(Debug, Clone)]
pub struct FormatChoiceSubmission {
    /// Magic link token.
    pub token: String,
    /// Delivery address.
    pub address: PostalAddress,
    /// Requested split per line.
    pub allocation: Allocation,
}

/// A refund request as submitted by the customer.
#[derive(Debug, Clone)]
pub struct RefundSubmission {
    /// Magic link token.
    pub token: String,
    /// Postal address.
    pub address: PostalAddress,
    /// Raw bank details.
    pub bank: BankDetails,
}

async fn unused_token<S: Store>(
    store: &S,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ValidatedToken, AppError> {
    let validated = validate_token(store, token, now).await?;
    tracing::Span::current().record("customer_id", validated.customer.id.as_i32());
    if validated.link.used {
        tracing::info!("Submission with consumed token refused");
        return Err(AppError::TokenUsed);
    }
    Ok(validated)
}

/// Accept a format choice, replacing any previous one.
///
/// # Errors
///
/// Token lifecycle errors from [`validate_token`] plus `TokenUsed`, address
/// and allocation validation errors, and dependency failures.
#[instrument(skip_all, fields(customer_id))]
pub async fn submit_format_choice<S: Store, M: Mailer>(
    state: &AppState<S, M>,
    submission: FormatChoiceSubmission,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let ValidatedToken { link, customer } =
        unused_token(state.store(), &submission.token, now).await?;

    let address = submission.address.validate()?;
    let choices = validate_allocation(&customer.packs, &submission.allocation)?;

    let confirmation = templates::format_choice_confirmation(
        &customer,
        &state.settings().sender_name,
        &choices,
        &address,
    )
    .map_err(|e| AppError::Internal(format!("format confirmation template: {e}")))?;

    let rows = choices.len();
    state
        .store()
        .commit_format_choice(FormatChoiceCommit {
            customer_id: customer.id,
            token: link.token,
            address,
            choices,
            completed_at: now,
            confirmation,
        })
        .await?;
    state.notify_outbox();

    tracing::info!(rows, "Format choice recorded");
    Ok(())
}

/// Accept a refund request for every purchased pack.
///
/// # Errors
///
/// Token lifecycle errors from [`validate_token`] plus `TokenUsed`, address
/// and bank detail validation errors, and dependency failures.
#[instrument(skip_all, fields(customer_id))]
pub async fn submit_refund<S: Store, M: Mailer>(
    state: &AppState<S, M>,
    submission: RefundSubmission,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let ValidatedToken { link, customer } =
        unused_token(state.store(), &submission.token, now).await?;

    let address = submission.address.validate()?;
    let (iban, bic) = submission.bank.validate()?;
    let amount = customer.computed_refund();

    let confirmation = templates::refund_confirmation(
        &customer,
        &state.settings().sender_name,
        amount,
        &address,
        &iban,
        &bic,
    )
    .map_err(|e| AppError::Internal(format!("refund confirmation template: {e}")))?;

    state
        .store()
        .commit_refund(RefundCommit {
            customer_id: customer.id,
            token: link.token,
            address,
            iban,
            bic,
            amount,
            requested_at: now,
            confirmation,
        })
        .await?;
    state.notify_outbox();

    tracing::info!(amount = amount.rounded(), "Refund request recorded");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxset_core::{FormatSplit, PackCounts, PackLine};
    use chrono::Duration;

    use crate::db::{CustomerLedger, TokenStore};
    use crate::models::{CredentialPurpose, NewMagicLink};
    use crate::testing::{MemoryStore, RecordingMailer, test_state};

    fn address() -> PostalAddress {
        PostalAddress {
            line1: "3 place du Marché".into(),
            line2: Some("  ".into()),
            postal_code: "69001".into(),
            city: "Lyon".into(),
            country: "France".into(),
        }
    }

    async fn issue(store: &MemoryStore, packs: PackCounts, now: DateTime<Utc>) -> String {
        let customer = store.add_customer("fan@example.fr", packs).await;
        store
            .insert_magic_link(NewMagicLink {
                token: "tok".into(),
                customer_id: customer.id,
                purpose: CredentialPurpose::FormatChoice,
                created_at: now,
                expires_at: now + Duration::hours(24),
            })
            .await
            .unwrap();
        "tok".into()
    }

    fn allocation(cd: u32, vinyle: u32) -> Allocation {
        Allocation::from_splits([(PackLine::Melancolie, FormatSplit { cd, vinyle })])
    }

    #[tokio::test]
    async fn test_format_choice_commits_and_consumes_token() {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let now = Utc::now();
        let token = issue(state.store(), PackCounts::new(2, 0), now).await;

        submit_format_choice(
            &state,
            FormatChoiceSubmission {
                token: token.clone(),
                address: address(),
                allocation: allocation(1, 1),
            },
            now,
        )
        .await
        .unwrap();

        let customer = state
            .store()
            .find_customer_by_email(&"fan@example.fr".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(customer.format_choice_completed);
        assert_eq!(customer.address.line2, None);
        assert_eq!(state.store().format_choices(customer.id).await.len(), 2);
        assert_eq!(state.store().outbox().await.len(), 1);

        let again = submit_format_choice(
            &state,
            FormatChoiceSubmission {
                token,
                address: address(),
                allocation: allocation(2, 0),
            },
            now,
        )
        .await;
        assert!(matches!(again, Err(AppError::TokenUsed)));
    }

    #[tokio::test]
    async fn test_mismatch_writes_nothing() {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let now = Utc::now();
        let token = issue(state.store(), PackCounts::new(2, 0), now).await;

        let result = submit_format_choice(
            &state,
            FormatChoiceSubmission {
                token: token.clone(),
                address: address(),
                allocation: allocation(1, 0),
            },
            now,
        )
        .await;

        assert!(matches!(result, Err(AppError::Allocation(_))));
        let link = state.store().find_magic_link(&token).await.unwrap().unwrap();
        assert!(!link.used);
        assert!(state.store().outbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_refund_stores_amount_and_normalized_bank_details() {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let now = Utc::now();
        let token = issue(state.store(), PackCounts::new(2, 1), now).await;

        submit_refund(
            &state,
            RefundSubmission {
                token,
                address: address(),
                bank: BankDetails {
                    iban: "fr76 3000 6000 0112 3456 7890 189".into(),
                    bic: "bnpafrpp".into(),
                },
            },
            now,
        )
        .await
        .unwrap();

        let customer = state
            .store()
            .find_customer_by_email(&"fan@example.fr".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(customer.refund_requested);
        assert_eq!(customer.refund_amount.unwrap().rounded(), 45);
        assert_eq!(customer.iban.as_deref(), Some("FR7630006000011234567890189"));
        assert_eq!(customer.bic.as_deref(), Some("BNPAFRPP"));
    }

    #[tokio::test]
    async fn test_refund_rejects_bad_iban_before_writing() {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let now = Utc::now();
        let token = issue(state.store(), PackCounts::new(1, 0), now).await;

        let result = submit_refund(
            &state,
            RefundSubmission {
                token,
                address: address(),
                bank: BankDetails {
                    iban: "1234".into(),
                    bic: "BNPAFRPPXXX".into(),
                },
            },
            now,
        )
        .await;

        assert_eq!(result.unwrap_err().code(), "INVALID_IBAN");
        assert!(state.store().outbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_is_gone() {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let now = Utc::now();
        let token = issue(state.store(), PackCounts::new(1, 0), now).await;

        let result = submit_format_choice(
            &state,
            FormatChoiceSubmission {
                token,
                address: address(),
                allocation: allocation(1, 0),
            },
            now + Duration::hours(24),
        )
        .await;

        assert!(matches!(result, Err(AppError::TokenExpired)));
    }
}
