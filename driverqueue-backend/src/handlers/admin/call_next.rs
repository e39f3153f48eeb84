use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, state::AppState};

/// POST /admin/call-next
/// Returns `{ "driver": null }` when nobody is waiting.
pub async fn call_next(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let auth = require_admin(&state, &headers).await?;

    let called = state.queue.call_next().await?;
    match &called {
        Some(entry) => tracing::info!(
            admin = ?auth.subject,
            driver_id = entry.id,
            plate = %entry.plate,
            "called next driver"
        ),
        None => tracing::debug!(admin = ?auth.subject, "call-next on an empty queue"),
    }
    Ok(Json(json!({ "driver": called })))
}
