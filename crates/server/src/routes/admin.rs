//! Operator dashboard handler.

use axum::{Json, extract::State};

use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::email::Mailer;
use crate::services::stats::{StatsReport, load_stats};
use crate::state::AppState;

/// Aggregate refund campaign figures.
pub async fn stats<S: Store, M: Mailer>(
    _admin: RequireAdmin,
    State(state): State<AppState<S, M>>,
) -> Result<Json<StatsReport>> {
    let report = load_stats(state.store()).await?;
    Ok(Json(report))
}
