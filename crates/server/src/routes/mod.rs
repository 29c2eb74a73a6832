//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store ping)
//!
//! # Magic links
//! POST /credential             - Email a magic link (rate limited in the binary)
//! POST /validate-token         - Resolve a token to the customer's current data
//!
//! # Submissions (consume the token)
//! POST /format-choice          - Record CD/vinyl split and delivery address
//! POST /refund-request         - Record refund request with bank details
//!
//! # Operators
//! GET  /admin-stats            - Refund campaign dashboard (bearer credential)
//! ```

pub mod admin;
pub mod credential;
pub mod health;
pub mod self_service;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::Store;
use crate::services::email::Mailer;
use crate::state::AppState;

/// Magic link issuance, kept apart so the binary can rate limit it.
pub fn credential_routes<S: Store, M: Mailer>() -> Router<AppState<S, M>> {
    Router::new().route("/credential", post(credential::request_credential::<S, M>))
}

/// Token-bearing customer endpoints.
pub fn self_service_routes<S: Store, M: Mailer>() -> Router<AppState<S, M>> {
    Router::new()
        .route("/validate-token", post(self_service::validate::<S, M>))
        .route("/format-choice", post(self_service::format_choice::<S, M>))
        .route("/refund-request", post(self_service::refund_request::<S, M>))
}

/// Operator endpoints.
pub fn admin_routes<S: Store, M: Mailer>() -> Router<AppState<S, M>> {
    Router::new().route("/admin-stats", get(admin::stats::<S, M>))
}

/// Liveness and readiness probes.
pub fn health_routes<S: Store, M: Mailer>() -> Router<AppState<S, M>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S, M>))
}

/// Create every route of the service, without middleware.
pub fn routes<S: Store, M: Mailer>() -> Router<AppState<S, M>> {
    Router::new()
        .merge(credential_routes())
        .merge(self_service_routes())
        .merge(admin_routes())
        .merge(health_routes())
}
