use std::collections::HashMap;

use crate::error::ApiError;

/// Read the `driverId` path segment as a numeric entry id.
pub fn parse_driver_id(path: &HashMap<String, String>) -> Result<i64, ApiError> {
    let raw = path
        .get("driverId")
        .ok_or_else(|| ApiError::not_found("driver id missing"))?;
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("driverId must be a positive integer"))
}

/// Parse an optional non-negative integer query parameter; range checks belong to the caller.
pub fn parse_optional_u32(raw: Option<&String>, field: &str) -> Result<Option<u32>, ApiError> {
    match raw {
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{field} must be a non-negative integer"))),
        None => Ok(None),
    }
}
