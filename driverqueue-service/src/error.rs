//! Error types for the queue service.

use thiserror::Error;

use crate::types::DriverStatus;
use crate::validation::ValidationIssue;

/// Errors that may occur while operating on the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid input: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("plate {plate} is already registered")]
    Conflict { plate: String },

    #[error("driver entry {0} not found")]
    NotFound(i64),

    #[error("driver entry {id} is {actual}, expected {expected}")]
    InvalidState {
        id: i64,
        actual: DriverStatus,
        expected: DriverStatus,
    },

    #[error("{operation} kept losing to concurrent updates; giving up")]
    Contention { operation: &'static str },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// SQLite reports lock and snapshot conflicts as BUSY (5) or LOCKED (6), possibly extended.
pub(crate) fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
