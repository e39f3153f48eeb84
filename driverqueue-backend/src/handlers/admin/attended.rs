use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Json, Path};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, handlers::utils::parse_driver_id, state::AppState};

/// POST /admin/drivers/{driverId}/attended
pub async fn attended(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers).await?;

    let id = parse_driver_id(&path)?;
    let entry = state.queue.mark_attended(id).await?;
    Ok(Json(json!({ "driver": entry })))
}
