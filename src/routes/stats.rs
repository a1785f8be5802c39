//! Dashboard statistics route.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::DashboardStats;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stats", get(get_stats))
}

/// Streaks and completion rates, computed from the full journal.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>> {
    let entries = state.db.list_journal_entries(&user.uid).await?;
    Ok(Json(DashboardStats::compute(&entries, state.clock.today())))
}
