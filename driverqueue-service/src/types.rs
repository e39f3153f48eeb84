//! Core types for the driver queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use driverqueue_db::drivers::DriverEntriesRow;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queue entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Waiting,
    Called,
    Attended,
    NoShow,
    Cleared,
}

impl DriverStatus {
    pub const TERMINAL: [DriverStatus; 3] = [Self::Attended, Self::NoShow, Self::Cleared];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Called => "CALLED",
            Self::Attended => "ATTENDED",
            Self::NoShow => "NO_SHOW",
            Self::Cleared => "CLEARED",
        }
    }

    /// Returns true if this status represents a terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Attended | Self::NoShow | Self::Cleared)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown driver status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for DriverStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(Self::Waiting),
            "CALLED" => Ok(Self::Called),
            "ATTENDED" => Ok(Self::Attended),
            "NO_SHOW" => Ok(Self::NoShow),
            "CLEARED" => Ok(Self::Cleared),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One driver's record in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverEntry {
    pub id: i64,
    pub plate: String,
    pub name: String,
    pub phone_number: String,
    pub entry_time: DateTime<Utc>,
    pub called_time: Option<DateTime<Utc>>,
    pub status: DriverStatus,
    pub call_attempts: u32,
}

/// Raw registration input, before validation and normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDriver {
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Fixed-width UTC form used for stored timestamps, so text order matches time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(format!("invalid timestamp '{raw}': {e}").into()))
}

impl TryFrom<DriverEntriesRow> for DriverEntry {
    type Error = sqlx::Error;

    fn try_from(row: DriverEntriesRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<DriverStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let call_attempts = u32::try_from(row.call_attempts)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let called_time = row.called_time.as_deref().map(parse_timestamp).transpose()?;

        Ok(Self {
            id: row.id,
            entry_time: parse_timestamp(&row.entry_time)?,
            called_time,
            status,
            call_attempts,
            plate: row.plate,
            name: row.name,
            phone_number: row.phone_number,
        })
    }
}
