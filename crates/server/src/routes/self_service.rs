//! Token-bearing customer endpoints.
//!
//! Request fields are all optional at the serde level so that an absent
//! token or section is reported with its own error code instead of a generic
//! deserialization failure.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boxset_core::{Allocation, Amount, BankDetails, CustomerId, FormatChoice, PostalAddress};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{CredentialPurpose, Customer};
use crate::routes::credential::Success;
use crate::services::email::Mailer;
use crate::services::submission::{
    FormatChoiceSubmission, RefundSubmission, submit_format_choice, submit_refund,
};
use crate::services::token::{ValidatedToken, validate_token};
use crate::state::AppState;

/// Country shown when the customer never supplied one.
const DEFAULT_COUNTRY: &str = "France";

/// Body of `POST /validate-token`.
#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `POST /format-choice`.
#[derive(Debug, Deserialize)]
pub struct FormatChoiceRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub choices: Option<Allocation>,
}

/// Body of `POST /refund-request`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
}

/// What a customer page needs to prefill itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: CustomerId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub melancolie: u32,
    pub symphonie: u32,
    pub refund_amount: Amount,
    pub refund_requested: bool,
    pub format_choice_completed: bool,
    pub address: PostalAddress,
    pub iban: String,
    pub bic: String,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        let refund_amount = customer.computed_refund();
        let mut address = customer.address;
        if address.country.trim().is_empty() {
            address.country = DEFAULT_COUNTRY.to_string();
        }
        Self {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email.into_inner(),
            melancolie: customer.packs.melancolie,
            symphonie: customer.packs.symphonie,
            refund_amount,
            refund_requested: customer.refund_requested,
            format_choice_completed: customer.format_choice_completed,
            address,
            iban: customer.iban.unwrap_or_default(),
            bic: customer.bic.unwrap_or_default(),
        }
    }
}

/// Response of `POST /validate-token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenResponse {
    pub customer: CustomerView,
    pub existing_choices: Vec<FormatChoice>,
    pub already_used: bool,
    pub expires_at: DateTime<Utc>,
    pub purpose: CredentialPurpose,
}

fn require_token(token: Option<String>) -> Result<String> {
    token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::TokenRequired)
}

fn require_fields(fields: &[(&str, bool)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing.join(", ")))
    }
}

/// Resolve a token and return the customer's current data.
///
/// A consumed but unexpired token still resolves, with `alreadyUsed: true`.
pub async fn validate<S: Store, M: Mailer>(
    State(state): State<AppState<S, M>>,
    body: std::result::Result<Json<ValidateTokenRequest>, JsonRejection>,
) -> Result<Json<ValidateTokenResponse>> {
    let Json(request) = body?;
    let token = require_token(request.token)?;

    let ValidatedToken { link, customer } =
        validate_token(state.store(), &token, Utc::now()).await?;
    let existing_choices = state.store().list_format_choices(customer.id).await?;

    Ok(Json(ValidateTokenResponse {
        customer: customer.into(),
        existing_choices,
        already_used: link.used,
        expires_at: link.expires_at,
        purpose: link.purpose,
    }))
}

/// Record a format choice.
pub async fn format_choice<S: Store, M: Mailer>(
    State(state): State<AppState<S, M>>,
    body: std::result::Result<Json<FormatChoiceRequest>, JsonRejection>,
) -> Result<Json<Success>> {
    let Json(request) = body?;
    let token = require_token(request.token)?;
    require_fields(&[
        ("address", request.address.is_some()),
        ("choices", request.choices.is_some()),
    ])?;

    let submission = FormatChoiceSubmission {
        token,
        address: request.address.unwrap_or_default(),
        allocation: request.choices.unwrap_or_default(),
    };
    submit_format_choice(&state, submission, Utc::now()).await?;
    Ok(Json(Success::OK))
}

/// Record a refund request.
pub async fn refund_request<S: Store, M: Mailer>(
    State(state): State<AppState<S, M>>,
    body: std::result::Result<Json<RefundRequest>, JsonRejection>,
) -> Result<Json<Success>> {
    let Json(request) = body?;
    let token = require_token(request.token)?;
    require_fields(&[
        ("address", request.address.is_some()),
        ("bankDetails", request.bank_details.is_some()),
    ])?;

    let submission = RefundSubmission {
        token,
        address: request.address.unwrap_or_default(),
        bank: request.bank_details.unwrap_or_default(),
    };
    submit_refund(&state, submission, Utc::now()).await?;
    Ok(Json(Success::OK))
}
