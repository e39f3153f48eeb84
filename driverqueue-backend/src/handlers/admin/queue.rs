use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, state::AppState};

/// GET /admin/queue
pub async fn queue(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers).await?;

    let drivers = state.queue.list_waiting().await?;
    Ok(Json(json!({ "count": drivers.len(), "drivers": drivers })))
}
