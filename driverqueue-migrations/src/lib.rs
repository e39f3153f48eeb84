use sqlx::migrate::Migrator;

pub static SQLITE_MIGRATOR: Migrator = sqlx_macros::migrate!("src/migrations_sqlite");

pub fn sqlite_migrator() -> &'static Migrator {
    &SQLITE_MIGRATOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn migrated_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        sqlite_migrator().run(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn migrations_apply_cleanly() {
        let pool = migrated_pool().await;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM driver_entries")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn status_is_constrained() {
        let pool = migrated_pool().await;
        let res = sqlx::query(
            "INSERT INTO driver_entries (plate, name, phone_number, entry_time, status) \
             VALUES ('ABC1234', 'Jane', '+5511999998888', '2024-01-01T00:00:00.000000Z', 'parked')",
        )
        .execute(&pool)
        .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn plate_is_unique() {
        let pool = migrated_pool().await;
        let insert = "INSERT INTO driver_entries (plate, name, phone_number, entry_time) \
                      VALUES ('ABC1234', 'Jane', '+5511999998888', '2024-01-01T00:00:00.000000Z')";
        sqlx::query(insert).execute(&pool).await.expect("first");
        assert!(sqlx::query(insert).execute(&pool).await.is_err());
    }
}
