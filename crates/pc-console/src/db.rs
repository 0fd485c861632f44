use pc_common::error::{AppError, AppResult};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn connect_and_migrate(database_url: &str) -> AppResult<SqlitePool> {
    // Each connection to an in-memory url opens a separate database.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| AppError::External(format!("sqlite connect failed: {e}")))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::External(format!("sqlite migrate failed: {e}")))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect_and_migrate("sqlite::memory:").await.expect("pool")
}
