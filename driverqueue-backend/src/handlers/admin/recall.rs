use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Json, Path};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::handlers::auth::utils::require_admin;
use crate::{error::ApiError, handlers::utils::parse_driver_id, state::AppState};

/// POST /admin/drivers/{driverId}/recall
/// Either reminds the driver again or, past the attempt limit, marks them `NO_SHOW`.
pub async fn recall(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers).await?;

    let id = parse_driver_id(&path)?;
    let entry = state.queue.recall(id).await?;
    Ok(Json(json!({ "driver": entry })))
}
