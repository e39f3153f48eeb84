use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Json, Query};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, handlers::utils::parse_optional_u32, state::AppState};

/// GET /admin/history?limit=N
pub async fn history(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers).await?;

    let limit = parse_optional_u32(params.get("limit"), "limit")?;

    let drivers = state.queue.history(limit).await?;
    Ok(Json(json!({ "count": drivers.len(), "drivers": drivers })))
}
