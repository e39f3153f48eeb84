use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use driverqueue_config::{Config, NotificationProvider};
use driverqueue_db::DbConnectionConfig;
use driverqueue_notify::{LogOnlyGateway, NotificationGateway, TwilioConfig, TwilioGateway};
use driverqueue_service::QueuePolicy;

/// Build database connection config from application config.
pub fn database_config_from_config(cfg: &Config) -> DbConnectionConfig {
    let mut db = DbConnectionConfig::new(cfg.database.url.clone());
    if let Some(max) = cfg.database.max_connections {
        db.max_connections = max;
    }
    db
}

/// Build the SMS gateway selected by `notifications.provider`.
pub fn gateway_from_config(cfg: &Config) -> anyhow::Result<Arc<dyn NotificationGateway>> {
    let n = &cfg.notifications;
    match n.provider {
        NotificationProvider::Log => {
            tracing::warn!("no SMS provider configured; notifications will only be logged");
            Ok(Arc::new(LogOnlyGateway))
        }
        NotificationProvider::Twilio => {
            let gateway = TwilioGateway::new(TwilioConfig {
                account_sid: n.account_sid.clone().unwrap_or_default(),
                auth_token: n.auth_token.clone().unwrap_or_default(),
                from_number: n.from_number.clone().unwrap_or_default(),
                api_base: n.api_base.clone(),
                timeout: Duration::from_secs(n.timeout_secs),
            })?;
            tracing::info!(endpoint = %gateway.endpoint(), "twilio gateway configured");
            Ok(Arc::new(gateway))
        }
    }
}

/// Build the queue policy; unset message templates keep the built-in wording.
pub fn policy_from_config(cfg: &Config) -> QueuePolicy {
    let q = &cfg.queue;
    let defaults = QueuePolicy::default();
    QueuePolicy {
        max_call_attempts: q.max_call_attempts,
        default_country_code: q.default_country_code.clone(),
        name_min_chars: q.name_min_chars,
        name_max_chars: q.name_max_chars,
        call_message: q.call_message.clone().unwrap_or(defaults.call_message),
        recall_message: q.recall_message.clone().unwrap_or(defaults.recall_message),
    }
}

/// Parse host:port into a SocketAddr; `localhost` binds loopback, anything else unparseable binds 0.0.0.0.
pub fn parse_bind_address(host: &str, port: u16) -> SocketAddr {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .or_else(|_| host.parse::<SocketAddr>())
        .or_else(|_| host.parse::<Ipv6Addr>().map(|ip| SocketAddr::new(IpAddr::V6(ip), port)))
        .unwrap_or_else(|_| match host {
            "localhost" => SocketAddr::from(([127, 0, 0, 1], port)),
            _ => {
                tracing::warn!(%host, "unparseable bind host; listening on all interfaces");
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        })
}
