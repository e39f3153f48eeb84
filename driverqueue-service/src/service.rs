//! Queue service: every state transition and ordering rule for driver entries.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use driverqueue_db::drivers::{self, EntryUpdate, NewDriverEntry};
use driverqueue_db::DbPool;
use driverqueue_notify::{NotificationGateway, NotifyError};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, error, info, warn};

use crate::error::{is_busy, is_unique_violation, QueueError};
use crate::policy::QueuePolicy;
use crate::types::{format_timestamp, DriverEntry, DriverStatus, RegisterDriver};
use crate::validation::{validate_registration, ValidationIssue};

/// Attempts per mutating operation before reporting contention.
pub const DEFAULT_MAX_RETRIES: usize = 5;

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Source of "now" for entry and call timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of one optimistic attempt.
enum Attempt<T> {
    Done(T),
    Retry,
}

/// What a successful recall did, so the reminder can go out after commit.
enum RecallOutcome {
    Reminded(DriverEntry),
    GaveUp(DriverEntry),
}

/// Shared handle to the queue. Cheap to clone.
#[derive(Clone)]
pub struct QueueService {
    pool: DbPool,
    gateway: Arc<dyn NotificationGateway>,
    policy: Arc<QueuePolicy>,
    clock: Arc<dyn Clock>,
    max_retries: usize,
}

impl fmt::Debug for QueueService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueService")
            .field("gateway", &self.gateway.name())
            .field("policy", &self.policy)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl QueueService {
    pub fn new(pool: DbPool, gateway: Arc<dyn NotificationGateway>, policy: QueuePolicy) -> Self {
        Self {
            pool,
            gateway,
            policy: Arc::new(policy),
            clock: Arc::new(SystemClock),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Round-trips a trivial query; used by readiness probes.
    pub async fn ping(&self) -> Result<(), QueueError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Takes the write lock up front so concurrent writers queue on the busy
    /// timeout instead of failing their snapshot upgrade.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, QueueError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    fn now_stamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Validates, normalizes and enqueues a new driver as `WAITING`.
    pub async fn register(&self, input: RegisterDriver) -> Result<DriverEntry, QueueError> {
        let normalized = validate_registration(&input, &self.policy).map_err(QueueError::Validation)?;
        let entry_time = self.now_stamp();

        let row = drivers::insert(
            &self.pool,
            &NewDriverEntry {
                plate: &normalized.plate,
                name: &normalized.name,
                phone_number: &normalized.phone_number,
                entry_time: &entry_time,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                QueueError::Conflict {
                    plate: normalized.plate.clone(),
                }
            } else {
                QueueError::Database(e)
            }
        })?;

        let entry = DriverEntry::try_from(row)?;
        info!(driver_id = entry.id, plate = %entry.plate, "driver registered");
        Ok(entry)
    }

    pub async fn get(&self, id: i64) -> Result<DriverEntry, QueueError> {
        let row = drivers::find_by_id(&self.pool, id)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        Ok(DriverEntry::try_from(row)?)
    }

    /// `WAITING` entries in call order.
    pub async fn list_waiting(&self) -> Result<Vec<DriverEntry>, QueueError> {
        let rows = drivers::list_by_entry_time(&self.pool, DriverStatus::Waiting.as_str()).await?;
        collect_entries(rows)
    }

    /// `CALLED` entries, most recent call first.
    pub async fn list_called(&self) -> Result<Vec<DriverEntry>, QueueError> {
        let rows = drivers::list_by_called_time(&self.pool, DriverStatus::Called.as_str()).await?;
        collect_entries(rows)
    }

    /// The entry with the most recent call, whatever its status is now.
    pub async fn last_called(&self) -> Result<Option<DriverEntry>, QueueError> {
        drivers::find_last_called(&self.pool)
            .await?
            .map(DriverEntry::try_from)
            .transpose()
            .map_err(QueueError::from)
    }

    /// Entries in terminal states, newest arrival first.
    pub async fn history(&self, limit: Option<u32>) -> Result<Vec<DriverEntry>, QueueError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(QueueError::Validation(vec![ValidationIssue::new(
                "limit",
                "out_of_range",
                format!("limit must be between 1 and {MAX_HISTORY_LIMIT}"),
            )]));
        }
        let statuses = DriverStatus::TERMINAL.map(DriverStatus::as_str);
        let rows = drivers::list_history(&self.pool, &statuses, i64::from(limit)).await?;
        collect_entries(rows)
    }

    /// Calls the oldest waiting driver. Returns `None` when nobody is waiting.
    pub async fn call_next(&self) -> Result<Option<DriverEntry>, QueueError> {
        let called = self
            .retrying("call_next", || self.try_call_next())
            .await?;

        if let Some(entry) = &called {
            info!(driver_id = entry.id, plate = %entry.plate, "driver called");
            let message = self.policy.call_message_for(entry);
            self.notify(entry, &message).await;
        } else {
            debug!("call_next on empty queue");
        }
        Ok(called)
    }

    async fn try_call_next(&self) -> Result<Attempt<Option<DriverEntry>>, QueueError> {
        let waiting = DriverStatus::Waiting.as_str();
        let mut tx = self.begin_write().await?;

        let Some(row) = drivers::find_oldest_by_status(&mut *tx, waiting).await? else {
            tx.rollback().await?;
            return Ok(Attempt::Done(None));
        };

        let called_time = self.now_stamp();
        let update = EntryUpdate {
            status: DriverStatus::Called.as_str(),
            called_time: Some(&called_time),
            call_attempts: 1,
        };
        if !drivers::compare_and_swap(&mut *tx, row.id, row.version, waiting, &update).await? {
            tx.rollback().await?;
            return Ok(Attempt::Retry);
        }

        let updated = drivers::find_by_id(&mut *tx, row.id)
            .await?
            .ok_or(QueueError::NotFound(row.id))?;
        tx.commit().await?;
        Ok(Attempt::Done(Some(DriverEntry::try_from(updated)?)))
    }

    /// Re-notifies a called driver, or gives up with `NO_SHOW` once the attempt budget is spent.
    pub async fn recall(&self, id: i64) -> Result<DriverEntry, QueueError> {
        match self.retrying("recall", || self.try_recall(id)).await? {
            RecallOutcome::Reminded(entry) => {
                info!(
                    driver_id = entry.id,
                    attempts = entry.call_attempts,
                    "driver recalled"
                );
                let message = self.policy.recall_message_for(&entry);
                self.notify(&entry, &message).await;
                Ok(entry)
            }
            RecallOutcome::GaveUp(entry) => {
                info!(
                    driver_id = entry.id,
                    attempts = entry.call_attempts,
                    "call attempts exhausted; marked no-show"
                );
                Ok(entry)
            }
        }
    }

    async fn try_recall(&self, id: i64) -> Result<Attempt<RecallOutcome>, QueueError> {
        let mut tx = self.begin_write().await?;
        let row = drivers::find_by_id(&mut *tx, id)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        let current = DriverEntry::try_from(row.clone())?;
        ensure_status(&current, DriverStatus::Called)?;

        let called_time;
        let (update, gave_up) = if current.call_attempts >= self.policy.max_call_attempts {
            (
                EntryUpdate {
                    status: DriverStatus::NoShow.as_str(),
                    called_time: row.called_time.as_deref(),
                    call_attempts: row.call_attempts,
                },
                true,
            )
        } else {
            called_time = self.now_stamp();
            (
                EntryUpdate {
                    status: DriverStatus::Called.as_str(),
                    called_time: Some(&called_time),
                    call_attempts: row.call_attempts + 1,
                },
                false,
            )
        };

        let called = DriverStatus::Called.as_str();
        if !drivers::compare_and_swap(&mut *tx, id, row.version, called, &update).await? {
            tx.rollback().await?;
            return Ok(Attempt::Retry);
        }

        let updated = drivers::find_by_id(&mut *tx, id)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        tx.commit().await?;

        let entry = DriverEntry::try_from(updated)?;
        Ok(Attempt::Done(if gave_up {
            RecallOutcome::GaveUp(entry)
        } else {
            RecallOutcome::Reminded(entry)
        }))
    }

    /// `CALLED` to `ATTENDED`.
    pub async fn mark_attended(&self, id: i64) -> Result<DriverEntry, QueueError> {
        let entry = self
            .retrying("mark_attended", || self.try_mark_attended(id))
            .await?;
        info!(driver_id = entry.id, "driver attended");
        Ok(entry)
    }

    async fn try_mark_attended(&self, id: i64) -> Result<Attempt<DriverEntry>, QueueError> {
        let mut tx = self.begin_write().await?;
        let row = drivers::find_by_id(&mut *tx, id)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        let current = DriverEntry::try_from(row.clone())?;
        ensure_status(&current, DriverStatus::Called)?;

        let update = EntryUpdate {
            status: DriverStatus::Attended.as_str(),
            called_time: row.called_time.as_deref(),
            call_attempts: row.call_attempts,
        };
        let called = DriverStatus::Called.as_str();
        if !drivers::compare_and_swap(&mut *tx, id, row.version, called, &update).await? {
            tx.rollback().await?;
            return Ok(Attempt::Retry);
        }

        let updated = drivers::find_by_id(&mut *tx, id)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        tx.commit().await?;
        Ok(Attempt::Done(DriverEntry::try_from(updated)?))
    }

    /// Moves every `WAITING` entry to `CLEARED` in one statement. Returns how many moved.
    pub async fn clear_waiting(&self) -> Result<u64, QueueError> {
        let cleared = self
            .retrying("clear_waiting", || self.try_clear_waiting())
            .await?;
        info!(cleared, "waiting queue cleared");
        Ok(cleared)
    }

    async fn try_clear_waiting(&self) -> Result<Attempt<u64>, QueueError> {
        let mut tx = self.begin_write().await?;
        let cleared = drivers::bulk_transition(
            &mut *tx,
            DriverStatus::Waiting.as_str(),
            DriverStatus::Cleared.as_str(),
        )
        .await?;
        tx.commit().await?;
        Ok(Attempt::Done(cleared))
    }

    /// Runs `attempt` until it completes, retrying lost compare-and-swaps and
    /// SQLite busy errors up to `max_retries` times.
    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, QueueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<T>, QueueError>>,
    {
        for round in 1..=self.max_retries {
            match attempt().await {
                Ok(Attempt::Done(value)) => return Ok(value),
                Ok(Attempt::Retry) => {
                    debug!(operation, round, "concurrent update detected; retrying");
                }
                Err(QueueError::Database(e)) if is_busy(&e) => {
                    debug!(operation, round, error = %e, "database busy; retrying");
                }
                Err(e) => return Err(e),
            }
            tokio::task::yield_now().await;
        }
        warn!(operation, retries = self.max_retries, "giving up after repeated contention");
        Err(QueueError::Contention { operation })
    }

    /// Best-effort send. Failures are logged and never reach the caller.
    async fn notify(&self, entry: &DriverEntry, message: &str) {
        match self.gateway.send(&entry.phone_number, message).await {
            Ok(receipt) => info!(
                driver_id = entry.id,
                gateway = self.gateway.name(),
                provider_id = receipt.provider_id.as_deref().unwrap_or("-"),
                "notification sent"
            ),
            Err(NotifyError::NotConfigured) => warn!(
                driver_id = entry.id,
                gateway = self.gateway.name(),
                "notification skipped: no provider configured"
            ),
            Err(e) => error!(
                driver_id = entry.id,
                gateway = self.gateway.name(),
                error = %e,
                "notification failed"
            ),
        }
    }
}

fn ensure_status(entry: &DriverEntry, expected: DriverStatus) -> Result<(), QueueError> {
    if entry.status == expected {
        Ok(())
    } else {
        Err(QueueError::InvalidState {
            id: entry.id,
            actual: entry.status,
            expected,
        })
    }
}

fn collect_entries(rows: Vec<drivers::DriverEntriesRow>) -> Result<Vec<DriverEntry>, QueueError> {
    rows.into_iter()
        .map(|row| DriverEntry::try_from(row).map_err(QueueError::from))
        .collect()
}
