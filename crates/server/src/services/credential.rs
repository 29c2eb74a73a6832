//! Magic link issuance.
//!
//! A credential is a 256-bit random token stored with a fixed 24 hour
//! expiry and emailed to the customer as a deep link into the page matching
//! its purpose. Delivery happens inline: if the mailer fails the caller gets
//! `EMAIL_SEND_FAILED` and may simply ask again.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::instrument;
use url::Url;

use boxset_core::Email;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{CredentialPurpose, MagicLink, NewMagicLink};
use crate::services::email::{Mailer, templates};
use crate::state::AppState;

/// Lifetime of a magic link.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Generate an opaque token: 32 random bytes, hex-encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Builds deep links from the configured public base URL.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    /// Wrap an absolute base URL.
    #[must_use]
    pub const fn new(base: Url) -> Self {
        Self { base }
    }

    /// `{base}/{page}?token={token}`.
    #[must_use]
    pub fn link(&self, purpose: CredentialPurpose, token: &str) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(purpose.page());
        }
        url.query_pairs_mut().clear().append_pair("token", token);
        url.into()
    }
}

/// Issue a magic link for the customer owning `raw_email` and email it.
///
/// # Errors
///
/// - `EmailRequired` when the address is blank
/// - `EmailNotFound` when the address is malformed or no customer has it
/// - `NoPacks` when the customer bought nothing; no token is stored
/// - `Database` / `Internal` / `EmailDelivery` on dependency failures
#[instrument(skip(state, raw_email), fields(customer_id))]
pub async fn issue_credential<S: Store, M: Mailer>(
    state: &AppState<S, M>,
    raw_email: Option<&str>,
    purpose: CredentialPurpose,
    now: DateTime<Utc>,
) -> Result<MagicLink, AppError> {
    let raw_email = raw_email
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::EmailRequired)?;
    let email = Email::normalize(raw_email).map_err(|e| {
        tracing::debug!(error = %e, "Credential email does not parse");
        AppError::EmailNotFound
    })?;

    let customer = state
        .store()
        .find_customer_by_email(&email)
        .await?
        .ok_or(AppError::EmailNotFound)?;
    tracing::Span::current().record("customer_id", customer.id.as_i32());

    if !customer.packs.has_any() {
        tracing::info!("Credential refused: no packs purchased");
        return Err(AppError::NoPacks);
    }

    let link = state
        .store()
        .insert_magic_link(NewMagicLink {
            token: generate_token(),
            customer_id: customer.id,
            purpose,
            created_at: now,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        })
        .await?;

    let settings = state.settings();
    let url = settings.links.link(purpose, &link.token);
    let message = templates::magic_link_email(&customer, &settings.sender_name, purpose, &url)
        .map_err(|e| AppError::Internal(format!("magic link template: {e}")))?;

    state.mailer().send(&message).await.map_err(|e| {
        tracing::warn!(error = %e, "Magic link email failed");
        AppError::EmailDelivery(e)
    })?;

    tracing::info!(purpose = purpose.as_str(), "Magic link issued");
    Ok(link)
}
