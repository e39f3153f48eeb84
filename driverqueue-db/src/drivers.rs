use crate::DbBackend;
use sqlx::Executor;

const COLUMNS: &str =
    "id, plate, name, phone_number, entry_time, called_time, status, call_attempts, version";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct DriverEntriesRow {
    pub id: i64,
    pub plate: String,
    pub name: String,
    pub phone_number: String,
    pub entry_time: String,
    pub called_time: Option<String>,
    pub status: String,
    pub call_attempts: i64,
    pub version: i64,
}

/// Column values for a new row. `status` and `call_attempts` take the table defaults.
#[derive(Debug, Clone)]
pub struct NewDriverEntry<'a> {
    pub plate: &'a str,
    pub name: &'a str,
    pub phone_number: &'a str,
    pub entry_time: &'a str,
}

/// The mutable columns of a row after a transition.
#[derive(Debug, Clone)]
pub struct EntryUpdate<'a> {
    pub status: &'a str,
    pub called_time: Option<&'a str>,
    pub call_attempts: i64,
}

pub async fn insert<'e, E>(executor: E, new: &NewDriverEntry<'_>) -> Result<DriverEntriesRow, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!(
        "INSERT INTO driver_entries (plate, name, phone_number, entry_time) VALUES (?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .bind(new.plate)
        .bind(new.name)
        .bind(new.phone_number)
        .bind(new.entry_time)
        .fetch_one(executor)
        .await
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!("SELECT {COLUMNS} FROM driver_entries WHERE id = ?");
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Entries in `status`, oldest arrival first.
pub async fn list_by_entry_time<'e, E>(
    executor: E,
    status: &str,
) -> Result<Vec<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM driver_entries WHERE status = ? ORDER BY entry_time ASC, id ASC"
    );
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .bind(status)
        .fetch_all(executor)
        .await
}

/// Entries in `status`, most recently called first.
pub async fn list_by_called_time<'e, E>(
    executor: E,
    status: &str,
) -> Result<Vec<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM driver_entries WHERE status = ? ORDER BY called_time DESC, id DESC"
    );
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .bind(status)
        .fetch_all(executor)
        .await
}

/// The oldest entry in `status`, tie-broken by id.
pub async fn find_oldest_by_status<'e, E>(
    executor: E,
    status: &str,
) -> Result<Option<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM driver_entries WHERE status = ? ORDER BY entry_time ASC, id ASC LIMIT 1"
    );
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .bind(status)
        .fetch_optional(executor)
        .await
}

pub async fn find_last_called<'e, E>(executor: E) -> Result<Option<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM driver_entries WHERE called_time IS NOT NULL ORDER BY called_time DESC, id DESC LIMIT 1"
    );
    sqlx::query_as::<_, DriverEntriesRow>(&sql)
        .fetch_optional(executor)
        .await
}

/// Entries whose status is one of `statuses`, newest arrival first.
pub async fn list_history<'e, E>(
    executor: E,
    statuses: &[&str],
    limit: i64,
) -> Result<Vec<DriverEntriesRow>, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; statuses.len()].join(", ");
    let sql = format!(
        "SELECT {COLUMNS} FROM driver_entries WHERE status IN ({placeholders}) ORDER BY entry_time DESC, id DESC LIMIT ?"
    );
    let mut query = sqlx::query_as::<_, DriverEntriesRow>(&sql);
    for status in statuses {
        query = query.bind(*status);
    }
    query.bind(limit).fetch_all(executor).await
}

/// Writes `update` only if the row still carries `expected_version` and
/// `expected_status`. Returns false when another writer got there first.
pub async fn compare_and_swap<'e, E>(
    executor: E,
    id: i64,
    expected_version: i64,
    expected_status: &str,
    update: &EntryUpdate<'_>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let result = sqlx::query(
        r#"
        UPDATE driver_entries
        SET status = ?, called_time = ?, call_attempts = ?, version = ?
        WHERE id = ? AND version = ? AND status = ?
        "#,
    )
    .bind(update.status)
    .bind(update.called_time)
    .bind(update.call_attempts)
    .bind(expected_version + 1)
    .bind(id)
    .bind(expected_version)
    .bind(expected_status)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves every row in `from` to `to` with zeroed attempts. Returns the number of rows touched.
pub async fn bulk_transition<'e, E>(executor: E, from: &str, to: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = DbBackend>,
{
    let result = sqlx::query(
        "UPDATE driver_entries SET status = ?, call_attempts = 0, version = version + 1 WHERE status = ?",
    )
    .bind(to)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
