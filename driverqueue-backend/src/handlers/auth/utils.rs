use axum::http::HeaderMap;
use driverqueue_auth::{AuthContext, AuthError};
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Session cookie name used for authentication.
pub const SESSION_COOKIE_NAME: &str = "driverqueue_session";

/// Extract authentication token from headers.
/// Checks Authorization header first, then falls back to session cookie.
/// Returns the token in "Bearer <token>" format for use with the authenticator.
pub fn extract_auth_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    {
        return Some(auth_header.to_string());
    }

    extract_session_cookie(headers).map(|token| format!("Bearer {}", token))
}

fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|c| {
            cookie::Cookie::parse(c.trim())
                .ok()
                .filter(|parsed| parsed.name() == SESSION_COOKIE_NAME)
                .map(|parsed| parsed.value().to_string())
        })
}

/// Require that the request is authenticated with admin scope.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let auth_token = extract_auth_token(headers);

    let auth = match state.authenticator().authenticate(auth_token.as_deref()).await {
        Ok(a) => a,
        Err(e) => {
            debug!(error = ?e, header_present = auth_token.is_some(), "authentication failure");
            return Err(ApiError::from(e));
        }
    };

    if !auth.is_admin() {
        debug!(subject = ?auth.subject, "admin scope missing");
        return Err(ApiError::Authentication(AuthError::AuthenticationFailed));
    }
    Ok(auth)
}
