//! Queue store: the `driver_entries` row type and the query functions the
//! service composes inside its transactions.
//!
//! Every function is generic over an `Executor`, so callers can pass a pool
//! or `&mut *tx` interchangeably.

pub type DbBackend = sqlx::Sqlite;

pub mod drivers;

pub use driverqueue_db_connection::{create_pool, DbConnectionConfig, DbConnectionError, DbPool};
