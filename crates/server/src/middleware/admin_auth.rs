//! Bearer credential check for the operator endpoints.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::db::Store;
use crate::error::AppError;
use crate::services::email::Mailer;
use crate::state::AppState;

/// Extractor that requires the admin bearer credential.
///
/// Rejects with [`AppError::Unauthorized`] when the `Authorization` header is
/// absent, is not a `Bearer` credential, or does not match the configured one.
///
/// # Example
///
/// ```rust,ignore
/// async fn stats_handler(_admin: RequireAdmin) -> impl IntoResponse {
///     "numbers"
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl<S: Store, M: Mailer> FromRequestParts<AppState<S, M>> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, M>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let expected = state.settings().admin_credential.expose_secret();
        if credentials_match(presented, expected) {
            Ok(Self)
        } else {
            tracing::warn!("Rejected admin request with wrong credential");
            Err(AppError::Unauthorized)
        }
    }
}

/// Compare two credentials without leaking where they differ.
///
/// Both sides are hashed first so the comparison length never depends on
/// the secret.
fn credentials_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    constant_time_compare(&presented, &expected)
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    use crate::testing::{MemoryStore, RecordingMailer, TEST_ADMIN_CREDENTIAL, test_state};

    async fn check(header: Option<&str>) -> Result<RequireAdmin, AppError> {
        let state = test_state(MemoryStore::new(), RecordingMailer::new());
        let mut builder = Request::builder().uri("/admin-stats");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        RequireAdmin::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn test_matching_bearer_is_accepted() {
        let header = format!("Bearer {TEST_ADMIN_CREDENTIAL}");
        assert!(check(Some(&header)).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_or_wrong_credential_is_rejected() {
        for header in [
            None,
            Some("Bearer "),
            Some("Bearer wrong-credential"),
            Some(TEST_ADMIN_CREDENTIAL),
            Some("Basic dXNlcjpwYXNz"),
        ] {
            assert!(matches!(check(header).await, Err(AppError::Unauthorized)));
        }
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"abc", b"abc"));
        assert!(!constant_time_compare(b"abc", b"abd"));
        assert!(!constant_time_compare(b"abc", b"ab"));
    }
}
