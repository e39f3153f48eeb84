use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use driverqueue_service::RegisterDriver;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// POST /drivers
/// Public self-registration. Every invalid field is reported in one response.
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payload = body
        .ok_or_else(|| ApiError::bad_request("missing request body"))?
        .0;
    let input: RegisterDriver = serde_json::from_value(payload).map_err(ApiError::from)?;

    let entry = state.queue.register(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "driver": entry }))))
}
