use axum::http::{header::SET_COOKIE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::auth::utils::SESSION_COOKIE_NAME;

/// POST /auth/logout
/// Clear cookie by setting expired Set-Cookie
pub async fn logout() -> Result<Response, ApiError> {
    let cookie = cookie::Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .max_age(cookie::time::Duration::ZERO)
        .build();

    let mut resp = (StatusCode::OK, Json(json!({ "ok": true }))).into_response();
    let header = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::Unexpected(format!("invalid session cookie: {e}")))?;
    resp.headers_mut().append(SET_COOKIE, header);
    Ok(resp)
}
