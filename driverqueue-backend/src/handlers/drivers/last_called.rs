use std::sync::Arc;

use axum::extract::{Extension, Json};
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// GET /drivers/last-called
/// The public display board: whoever was called most recently, or null.
pub async fn last_called(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let entry = state.queue.last_called().await?;
    Ok(Json(json!({ "driver": entry })))
}
