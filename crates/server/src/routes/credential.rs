//! Magic link request handler.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::Result;
use crate::models::CredentialPurpose;
use crate::services::credential::issue_credential;
use crate::services::email::Mailer;
use crate::state::AppState;

/// Body of `POST /credential`.
#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub purpose: Option<CredentialPurpose>,
}

/// Generic success acknowledgement.
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub(crate) const OK: Self = Self { success: true };
}

/// Email a magic link to a known customer with packs.
pub async fn request_credential<S: Store, M: Mailer>(
    State(state): State<AppState<S, M>>,
    body: std::result::Result<Json<CredentialRequest>, JsonRejection>,
) -> Result<Json<Success>> {
    let Json(request) = body?;
    issue_credential(
        &state,
        request.email.as_deref(),
        request.purpose.unwrap_or_default(),
        Utc::now(),
    )
    .await?;
    Ok(Json(Success::OK))
}
