use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize tracing from configuration. `RUST_LOG` takes precedence over `logging.level`.
pub fn install_tracing_from_config(cfg: &driverqueue_config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.level.clone());
    let env_filter = EnvFilter::try_new(&env_filter_str).unwrap_or_else(|e| {
        eprintln!("[STARTUP] invalid log filter '{env_filter_str}': {e}; using 'info'");
        EnvFilter::new("info")
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if cfg.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_timer(ChronoUtc::rfc_3339()))
            .try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
