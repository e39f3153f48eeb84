use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, state::AppState};

/// POST /admin/clear-queue
pub async fn clear(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let auth = require_admin(&state, &headers).await?;

    let cleared = state.queue.clear_waiting().await?;
    tracing::info!(admin = ?auth.subject, cleared, "cleared waiting queue");
    Ok(Json(json!({ "cleared": cleared })))
}
