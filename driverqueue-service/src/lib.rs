//! Driver queue core.
//!
//! Owns the driver lifecycle and the ordering policy:
//!
//! ```text
//! WAITING --call_next--> CALLED
//! WAITING --clear_waiting--> CLEARED
//! CALLED  --recall (attempts < max)--> CALLED (attempts + 1)
//! CALLED  --recall (attempts >= max)--> NO_SHOW
//! CALLED  --mark_attended--> ATTENDED
//! ```
//!
//! # Architecture
//!
//! - [`QueueService`] - The main interface; every mutation runs in one
//!   transaction guarded by a row version and is retried on contention
//! - [`QueuePolicy`] - Attempt limit, phone defaults, name bounds, message templates
//! - [`DriverEntry`] / [`DriverStatus`] - The queue record and its closed state set
//! - [`QueueError`] - Everything an operation can fail with
//!
//! Notifications go out through a [`driverqueue_notify::NotificationGateway`]
//! after the transaction commits; a failed send is logged and never undoes
//! the transition.

mod error;
pub mod phone;
mod policy;
mod service;
mod types;
mod validation;

pub use error::QueueError;
pub use policy::{
    QueuePolicy, DEFAULT_CALL_MESSAGE, DEFAULT_COUNTRY_CODE, DEFAULT_RECALL_MESSAGE,
    MAX_CALL_ATTEMPTS,
};
pub use service::{
    Clock, QueueService, SystemClock, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_RETRIES,
    MAX_HISTORY_LIMIT,
};
pub use types::{DriverEntry, DriverStatus, RegisterDriver, UnknownStatus};
pub use validation::{validate_registration, NormalizedRegistration, ValidationIssue};
