use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{admin, auth, drivers};
use crate::state::AppState;

pub const DEFAULT_STATIC_DIR: &str = "static";

/// Build the primary axum router with the provided shared application state.
///
/// Non-API paths are served from [`DEFAULT_STATIC_DIR`].
pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_static_dir(state, DEFAULT_STATIC_DIR)
}

pub fn build_router_with_static_dir(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        // public
        .route("/drivers", post(drivers::register::register))
        .route("/drivers/last-called", get(drivers::last_called::last_called))
        .route("/auth/login", post(auth::login::login))
        .route("/auth/logout", post(auth::logout::logout))
        // admin
        .route("/admin/queue", get(admin::queue::queue))
        .route("/admin/called", get(admin::called::called))
        .route("/admin/history", get(admin::history::history))
        .route("/admin/drivers/{driverId}", get(admin::get::get))
        .route("/admin/call-next", post(admin::call_next::call_next))
        .route("/admin/drivers/{driverId}/recall", post(admin::recall::recall))
        .route(
            "/admin/drivers/{driverId}/attended",
            post(admin::attended::attended),
        )
        .route("/admin/clear-queue", post(admin::clear::clear))
        .layer(Extension(state));

    let static_dir = static_dir.as_ref();
    let static_service = ServeDir::new(static_dir)
        .fallback(ServeDir::new(static_dir).append_index_html_on_directories(true));

    Router::new()
        .nest("/api", router)
        .fallback_service(static_service)
}

/// Router used when the server cannot authenticate admins: liveness only, 503 elsewhere.
pub fn maintenance_router(reason: &str) -> Router {
    tracing::info!(%reason, "starting maintenance router");
    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/ready",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
    Router::new()
        .nest("/api", router)
        .fallback(service_unavailable_handler)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.queue.ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(error) => {
            tracing::warn!(%error, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

async fn service_unavailable_handler() -> impl IntoResponse {
    let body = Html(
        "<html><head><title>Service Unavailable</title></head>\
         <body><h1>Service Unavailable</h1>\
         <p>The driver queue is undergoing maintenance or is not properly configured. \
         Please try again later.</p></body></html>",
    );
    (StatusCode::SERVICE_UNAVAILABLE, body)
}
