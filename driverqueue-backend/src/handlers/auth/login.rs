use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{header::SET_COOKIE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use driverqueue_auth::{AuthError, ADMIN_SCOPE};
use serde_json::json;

use crate::handlers::auth::utils::SESSION_COOKIE_NAME;
use crate::{error::ApiError, state::AppState};

/// POST /auth/login
/// Accepts { username, password } and if valid issues an HttpOnly cookie with an HS256 JWT.
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Response, ApiError> {
    let payload = body
        .ok_or_else(|| ApiError::bad_request("missing request body"))?
        .0;

    let dto: super::dto::Login = serde_json::from_value(payload).map_err(ApiError::from)?;

    let sessions = state
        .sessions()
        .ok_or_else(|| ApiError::unavailable("admin login is not configured"))?;

    if !sessions.admin.verify(&dto.username, &dto.password) {
        tracing::info!(username = %dto.username, "rejected admin login");
        return Err(ApiError::Authentication(AuthError::AuthenticationFailed));
    }

    let issued = sessions
        .issuer
        .issue(&sessions.admin.username, &[ADMIN_SCOPE])
        .map_err(ApiError::from)?;

    let max_age = cookie::time::Duration::seconds(sessions.issuer.ttl().num_seconds());
    let cookie = cookie::Cookie::build((SESSION_COOKIE_NAME, issued.token))
        .path("/")
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .max_age(max_age)
        .build();

    tracing::info!(username = %sessions.admin.username, "admin logged in");

    let mut resp = (
        StatusCode::OK,
        Json(json!({
            "username": sessions.admin.username,
            "expiresAt": issued.expires_at,
        })),
    )
        .into_response();
    let header = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::Unexpected(format!("invalid session cookie: {e}")))?;
    resp.headers_mut().append(SET_COOKIE, header);
    Ok(resp)
}
