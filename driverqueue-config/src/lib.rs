use driverqueue_notify::is_e164;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

static COUNTRY_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d{0,2}$").unwrap());

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub database: Option<DatabaseSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub queue: Option<QueueSection>,
    #[serde(default)]
    pub notifications: Option<NotificationsSection>,
    #[serde(default)]
    pub admin: Option<AdminSection>,
    #[serde(default)]
    pub auth: Option<AuthSection>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QueueSection {
    #[serde(default)]
    pub max_call_attempts: Option<u32>,
    #[serde(default)]
    pub default_country_code: Option<String>,
    #[serde(default)]
    pub name_min_chars: Option<usize>,
    #[serde(default)]
    pub name_max_chars: Option<usize>,
    #[serde(default)]
    pub call_message: Option<String>,
    #[serde(default)]
    pub recall_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationsSection {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminSection {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthSection {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub session_ttl_hours: Option<u64>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub notifications: NotificationsConfig,
    pub admin: AdminConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueConfig {
    pub max_call_attempts: u32,
    pub default_country_code: String,
    pub name_min_chars: usize,
    pub name_max_chars: usize,
    pub call_message: Option<String>,
    pub recall_message: Option<String>,
}

/// Which SMS provider the notification gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationProvider {
    Twilio,
    Log,
}

impl NotificationProvider {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "twilio" => Ok(Self::Twilio),
            "log" | "none" | "disabled" => Ok(Self::Log),
            other => Err(ConfigError::Parse(format!(
                "unsupported notifications.provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationsConfig {
    pub provider: NotificationProvider,
    pub account_sid: Option<String>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub session_ttl_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                static_dir: "static".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            database: DatabaseConfig {
                url: "sqlite://driverqueue.sqlite".to_string(),
                max_connections: None,
            },
            queue: QueueConfig {
                max_call_attempts: 2,
                default_country_code: "55".to_string(),
                name_min_chars: 3,
                name_max_chars: 100,
                call_message: None,
                recall_message: None,
            },
            notifications: NotificationsConfig {
                provider: NotificationProvider::Log,
                account_sid: None,
                auth_token: None,
                from_number: None,
                api_base: "https://api.twilio.com".to_string(),
                timeout_secs: 10,
            },
            admin: AdminConfig {
                username: "admin".to_string(),
                password: None,
                password_hash: None,
            },
            auth: AuthConfig {
                jwt_secret: None,
                session_ttl_hours: 12,
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    let bytes = s.as_bytes();
    match bytes {
        b"1" | b"true" | b"TRUE" | b"True" | b"yes" | b"YES" | b"Yes" | b"y" | b"Y" => Ok(true),
        b"0" | b"false" | b"FALSE" | b"False" | b"no" | b"NO" | b"No" | b"n" | b"N" => Ok(false),
        _ => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(()),
        },
    }
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        apply_raw(&mut cfg, raw)?;
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw(cfg: &mut Config, raw: RawConfigFile) -> Result<(), ConfigError> {
    if let Some(server) = raw.server {
        apply_opt!(cfg.server.host, server.host);
        apply_opt!(cfg.server.port, server.port);
        apply_opt!(cfg.server.static_dir, server.static_dir);
    }
    if let Some(logging) = raw.logging {
        apply_opt!(cfg.logging.level, logging.level);
        apply_opt!(cfg.logging.json, logging.json);
    }
    if let Some(db) = raw.database {
        apply_opt!(cfg.database.url, db.url);
        apply_opt!(cfg.database.max_connections, db.max_connections, wrap);
    }
    if let Some(q) = raw.queue {
        apply_opt!(cfg.queue.max_call_attempts, q.max_call_attempts);
        apply_opt!(cfg.queue.default_country_code, q.default_country_code);
        apply_opt!(cfg.queue.name_min_chars, q.name_min_chars);
        apply_opt!(cfg.queue.name_max_chars, q.name_max_chars);
        apply_opt!(cfg.queue.call_message, q.call_message, wrap);
        apply_opt!(cfg.queue.recall_message, q.recall_message, wrap);
    }
    if let Some(n) = raw.notifications {
        if let Some(provider) = n.provider {
            cfg.notifications.provider = NotificationProvider::parse(&provider)?;
        }
        apply_opt!(cfg.notifications.account_sid, n.account_sid, wrap);
        apply_opt!(cfg.notifications.auth_token, n.auth_token, wrap);
        apply_opt!(cfg.notifications.from_number, n.from_number, wrap);
        apply_opt!(cfg.notifications.api_base, n.api_base);
        apply_opt!(cfg.notifications.timeout_secs, n.timeout_secs);
    }
    if let Some(admin) = raw.admin {
        apply_opt!(cfg.admin.username, admin.username);
        apply_opt!(cfg.admin.password, admin.password, wrap);
        apply_opt!(cfg.admin.password_hash, admin.password_hash, wrap);
    }
    if let Some(auth) = raw.auth {
        apply_opt!(cfg.auth.jwt_secret, auth.jwt_secret, wrap);
        apply_opt!(cfg.auth.session_ttl_hours, auth.session_ttl_hours);
    }
    Ok(())
}

/// Helper to parse env var as a specific type
#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(v.trim())
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("DRIVERQUEUE_SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("DRIVERQUEUE_SERVER_PORT")? {
        cfg.server.port = v;
    }
    if let Some(v) = env_str("DRIVERQUEUE_STATIC_DIR") {
        cfg.server.static_dir = v;
    }

    // Logging
    if let Some(v) = env_str("DRIVERQUEUE_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("DRIVERQUEUE_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // Database
    if let Some(v) = env_str("DRIVERQUEUE_DATABASE_URL") {
        cfg.database.url = v;
    }
    if let Some(v) = env_parse::<u32>("DRIVERQUEUE_DB_MAX_CONNECTIONS")? {
        cfg.database.max_connections = Some(v);
    }

    // Queue policy
    if let Some(v) = env_parse::<u32>("DRIVERQUEUE_MAX_CALL_ATTEMPTS")? {
        cfg.queue.max_call_attempts = v;
    }
    if let Some(v) = env_str("DRIVERQUEUE_DEFAULT_COUNTRY_CODE") {
        cfg.queue.default_country_code = v;
    }

    // Notifications. The bare TWILIO_* names are accepted as fallbacks.
    if let Some(v) = env_str("DRIVERQUEUE_NOTIFICATIONS_PROVIDER") {
        cfg.notifications.provider = NotificationProvider::parse(&v)?;
    }
    if let Some(v) =
        env_str("DRIVERQUEUE_TWILIO_ACCOUNT_SID").or_else(|| env_str("TWILIO_ACCOUNT_SID"))
    {
        cfg.notifications.account_sid = Some(v);
    }
    if let Some(v) =
        env_str("DRIVERQUEUE_TWILIO_AUTH_TOKEN").or_else(|| env_str("TWILIO_AUTH_TOKEN"))
    {
        cfg.notifications.auth_token = Some(v);
    }
    if let Some(v) =
        env_str("DRIVERQUEUE_TWILIO_PHONE_NUMBER").or_else(|| env_str("TWILIO_PHONE_NUMBER"))
    {
        cfg.notifications.from_number = Some(v);
    }
    if let Some(v) = env_str("DRIVERQUEUE_TWILIO_API_BASE") {
        cfg.notifications.api_base = v;
    }
    if let Some(v) = env_parse::<u64>("DRIVERQUEUE_NOTIFICATIONS_TIMEOUT_SECS")? {
        cfg.notifications.timeout_secs = v;
    }

    // Admin account
    if let Some(v) = env_str("DRIVERQUEUE_ADMIN_USERNAME") {
        cfg.admin.username = v;
    }
    if let Some(v) = env_str("DRIVERQUEUE_ADMIN_PASSWORD") {
        cfg.admin.password = Some(v);
    }
    if let Some(v) = env_str("DRIVERQUEUE_ADMIN_PASSWORD_HASH") {
        cfg.admin.password_hash = Some(v);
    }

    // Auth
    if let Some(v) = env_str("DRIVERQUEUE_JWT_SECRET") {
        cfg.auth.jwt_secret = Some(v);
    }
    if let Some(v) = env_parse::<u64>("DRIVERQUEUE_SESSION_TTL_HOURS")? {
        cfg.auth.session_ttl_hours = v;
    }

    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    if !cfg.database.url.trim().to_ascii_lowercase().starts_with("sqlite:") {
        return Err(ConfigError::Validation(format!(
            "unsupported database.url (expected a sqlite: url): {}",
            cfg.database.url
        )));
    }
    if cfg.database.max_connections == Some(0) {
        return Err(ConfigError::Validation(
            "database.max_connections must be > 0".into(),
        ));
    }

    if cfg.queue.max_call_attempts == 0 {
        return Err(ConfigError::Validation(
            "queue.max_call_attempts must be >= 1".into(),
        ));
    }
    if !COUNTRY_CODE_REGEX.is_match(&cfg.queue.default_country_code) {
        return Err(ConfigError::Validation(format!(
            "queue.default_country_code must be 1-3 digits without '+': {}",
            cfg.queue.default_country_code
        )));
    }
    if cfg.queue.name_min_chars == 0 || cfg.queue.name_min_chars > cfg.queue.name_max_chars {
        return Err(ConfigError::Validation(
            "queue.name_min_chars must be between 1 and queue.name_max_chars".into(),
        ));
    }

    if cfg.notifications.provider == NotificationProvider::Twilio {
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if !present(&cfg.notifications.account_sid) || !present(&cfg.notifications.auth_token) {
            return Err(ConfigError::Validation(
                "notifications.account_sid and notifications.auth_token are required for twilio"
                    .into(),
            ));
        }
        match cfg.notifications.from_number.as_deref() {
            Some(n) if is_e164(n) => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "notifications.from_number must be E.164 (e.g. +15551234567): {}",
                    other.unwrap_or("<unset>")
                )))
            }
        }
    }
    match url::Url::parse(&cfg.notifications.api_base) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
        _ => {
            return Err(ConfigError::Validation(format!(
                "invalid notifications.api_base: {}",
                cfg.notifications.api_base
            )))
        }
    }
    if cfg.notifications.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "notifications.timeout_secs must be > 0".into(),
        ));
    }

    if cfg.admin.username.trim().is_empty() {
        return Err(ConfigError::Validation("admin.username must not be empty".into()));
    }
    if cfg.auth.session_ttl_hours == 0 {
        return Err(ConfigError::Validation(
            "auth.session_ttl_hours must be > 0".into(),
        ));
    }
    Ok(())
}
