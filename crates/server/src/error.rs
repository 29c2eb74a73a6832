//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Every handler returns
//! `Result<T, AppError>`; the response body is always
//! `{"error": "<CODE>", "message": "<text>"}`, plus `line` for allocation
//! mismatches.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use boxset_core::{AddressError, AllocationError, BankDetailsError, PackLine};

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No email in a credential request.
    #[error("Email is required")]
    EmailRequired,

    /// No customer has this email.
    #[error("No customer found for this email")]
    EmailNotFound,

    /// The customer bought nothing.
    #[error("No packs were purchased with this email")]
    NoPacks,

    /// No token in the request.
    #[error("Token is required")]
    TokenRequired,

    /// The token does not exist.
    #[error("Invalid token")]
    TokenInvalid,

    /// The token is past its expiry.
    #[error("Token has expired")]
    TokenExpired,

    /// The token was already consumed by a submission.
    #[error("Token has already been used")]
    TokenUsed,

    /// The token points at a customer that no longer exists.
    #[error("Customer not found")]
    CustomerNotFound,

    /// Required request fields are absent.
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// The submitted split does not match purchased counts.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// A required address field is blank.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Bank details are missing or malformed.
    #[error(transparent)]
    Bank(#[from] BankDetailsError),

    /// Malformed request body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Admin credential missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Persistence failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// The magic link email could not be delivered.
    #[error("Email delivery failed: {0}")]
    EmailDelivery(#[from] EmailError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TokenConsumed => Self::TokenUsed,
            RepositoryError::NotFound => Self::CustomerNotFound,
            other => Self::Database(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmailRequired => "EMAIL_REQUIRED",
            Self::EmailNotFound => "EMAIL_NOT_FOUND",
            Self::NoPacks => "NO_PACKS",
            Self::TokenRequired => "TOKEN_REQUIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenUsed => "TOKEN_USED",
            Self::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::Allocation(_) => "ALLOCATION_MISMATCH",
            Self::Address(_) => "MISSING_ADDRESS_FIELD",
            Self::Bank(BankDetailsError::MissingField(_)) => "MISSING_BANK_FIELD",
            Self::Bank(BankDetailsError::InvalidIban) => "INVALID_IBAN",
            Self::Bank(BankDetailsError::InvalidBic) => "INVALID_BIC",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::EmailDelivery(_) => "EMAIL_SEND_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::EmailRequired
            | Self::NoPacks
            | Self::TokenRequired
            | Self::MissingFields(_)
            | Self::Allocation(_)
            | Self::Address(_)
            | Self::Bank(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::EmailNotFound | Self::TokenInvalid | Self::CustomerNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::TokenExpired | Self::TokenUsed => StatusCode::GONE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::EmailDelivery(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<PackLine>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::EmailDelivery(_) => "The email could not be sent".to_string(),
            _ => self.to_string(),
        };

        let line = match &self {
            Self::Allocation(AllocationError::Mismatch { line, .. }) => Some(*line),
            _ => None,
        };

        let body = ErrorBody {
            error: self.code(),
            message,
            line,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::EmailRequired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::EmailNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::GONE);
        assert_eq!(AppError::TokenUsed.status(), StatusCode::GONE);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bank_error_codes() {
        assert_eq!(
            AppError::from(BankDetailsError::InvalidIban).code(),
            "INVALID_IBAN"
        );
        assert_eq!(AppError::from(BankDetailsError::InvalidBic).code(), "INVALID_BIC");
        assert_eq!(
            AppError::from(BankDetailsError::MissingField("bic")).code(),
            "MISSING_BANK_FIELD"
        );
    }

    #[test]
    fn test_repository_errors_map_to_lifecycle_codes() {
        assert_eq!(
            AppError::from(RepositoryError::TokenConsumed).code(),
            "TOKEN_USED"
        );
        assert_eq!(
            AppError::from(RepositoryError::NotFound).code(),
            "CUSTOMER_NOT_FOUND"
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("x".into())).code(),
            "DATABASE_ERROR"
        );
    }

    #[tokio::test]
    async fn test_allocation_body_names_line() {
        let (status, body) = body_json(AppError::from(AllocationError::Mismatch {
            line: PackLine::Symphonie,
            expected: 2,
            got: 1,
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ALLOCATION_MISMATCH");
        assert_eq!(body["line"], "symphonie");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_json(AppError::Internal("connection refused".into())).await;
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("line").is_none());
    }
}
