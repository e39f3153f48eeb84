//! Driver Queue Server
//!
//! Entry point: configuration loading, database migrations, SMS gateway
//! selection and HTTP server startup.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use driverqueue_backend::app::{build_router_with_static_dir, maintenance_router};
use driverqueue_backend::state::AppState;
use driverqueue_service::QueueService;

mod auth_builder;
mod bootstrap;
mod cli;
mod config_helpers;
mod tracing_setup;

use auth_builder::build_authenticator_from_config;
use bootstrap::resolve_admin_account;
use cli::CliArgs;
use config_helpers::{
    database_config_from_config, gateway_from_config, parse_bind_address, policy_from_config,
};
use tracing_setup::install_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eprintln!("[STARTUP] Driver queue starting...");
    let args = CliArgs::parse();

    eprintln!("[STARTUP] Loading config from: {:?}", args.config_path);
    let config = load_config(args.config_path.as_deref())?;
    eprintln!("[STARTUP] Config loaded successfully");

    if args.check_config {
        println!("configuration OK");
        return Ok(());
    }

    install_tracing_from_config(&config.logging)?;

    let db_cfg = database_config_from_config(&config);
    let db_pool = driverqueue_db::create_pool(&db_cfg).await?;
    run_migrations(&db_cfg, &db_pool).await?;

    tracing::info!(
        db = %driverqueue_db_connection::utils::config_metadata(&db_cfg),
        "database ready"
    );

    let gateway = gateway_from_config(&config)?;
    let policy = policy_from_config(&config);
    tracing::info!(
        gateway = gateway.name(),
        max_call_attempts = policy.max_call_attempts,
        default_country_code = %policy.default_country_code,
        "queue policy configured"
    );
    let queue = QueueService::new(db_pool, gateway, policy);

    let app = match build_authenticator_from_config(&config) {
        Ok(setup) => {
            tracing::info!(
                auth_mode = %setup.info.mode,
                key_bits = setup.info.bits,
                "authentication configured"
            );
            let mut state = AppState::new(queue, setup.authenticator);
            match resolve_admin_account(&config.admin)? {
                Some(admin) => state = state.with_sessions(setup.issuer, admin),
                None => tracing::warn!("admin login disabled; only pre-issued tokens are accepted"),
            }
            build_router_with_static_dir(Arc::new(state), &config.server.static_dir)
        }
        Err(reason) => {
            eprintln!("[STARTUP] ERROR: Authentication failed: {}", reason);
            tracing::error!(%reason, "entering maintenance mode due to authentication configuration");
            maintenance_router(&reason)
        }
    };

    let addr = parse_bind_address(&config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, static_dir = %config.server.static_dir, "server listening");
    eprintln!("[STARTUP] Server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Load configuration from file (if any) plus environment, then validate it.
fn load_config(path: Option<&Path>) -> anyhow::Result<driverqueue_config::Config> {
    let config = driverqueue_config::load_config(path).map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        anyhow::anyhow!(e.to_string())
    })?;
    driverqueue_config::validate_config(&config).map_err(|e| {
        eprintln!("invalid configuration: {e}");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(config)
}

async fn run_migrations(
    db_cfg: &driverqueue_db::DbConnectionConfig,
    db_pool: &driverqueue_db::DbPool,
) -> anyhow::Result<()> {
    let url = driverqueue_db_connection::utils::sanitize_database_url(&db_cfg.url);
    tracing::info!(db_url = %url, "applying SQLite migrations");
    match driverqueue_migrations::sqlite_migrator().run(db_pool).await {
        Ok(()) => {
            tracing::info!("database migrations applied successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(%e, "failed to apply database migrations");
            Err(anyhow::anyhow!("failed to apply database migrations: {e}"))
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
