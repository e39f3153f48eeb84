use std::borrow::Cow;

use serde_json::json;

use crate::config::DbConnectionConfig;

pub fn config_metadata(config: &DbConnectionConfig) -> serde_json::Value {
    json!({
        "database_url": sanitize_database_url(&config.url).as_ref(),
        "max_connections": config.max_connections,
        "min_connections": config.min_connections,
        "connect_timeout_secs": config.connect_timeout_secs,
        "idle_timeout_secs": config.idle_timeout_secs,
    })
}

/// Strips query parameters and any `user:pass@` authority from a database url
/// before it reaches a log line.
pub fn sanitize_database_url(raw: &str) -> Cow<'_, str> {
    let base = match raw.find('?') {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    let Some(scheme_end) = base.find("://") else {
        if base.to_ascii_lowercase().starts_with("sqlite:") {
            return if base.len() == raw.len() {
                Cow::Borrowed(raw)
            } else {
                Cow::Owned(base.to_owned())
            };
        }
        return Cow::Borrowed("<redacted>");
    };
    let rest = &base[scheme_end + 3..];

    let host_end = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..host_end];

    if let Some(at_pos) = authority.rfind('@') {
        let scheme = &base[..scheme_end + 3];
        let host_and_rest = &rest[at_pos + 1..];
        let mut result = String::with_capacity(scheme.len() + 10 + host_and_rest.len());
        result.push_str(scheme);
        result.push_str("****:****@");
        result.push_str(host_and_rest);
        Cow::Owned(result)
    } else if base.len() == raw.len() {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(base.to_owned())
    }
}
