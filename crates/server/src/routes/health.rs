//! Health probes.

use axum::{extract::State, http::StatusCode};

use crate::db::Store;
use crate::services::email::Mailer;
use crate::state::AppState;

/// Liveness check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: Store, M: Mailer>(State(state): State<AppState<S, M>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
