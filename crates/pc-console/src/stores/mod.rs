pub mod account;
pub mod assignment;
pub mod earnings;
pub mod rate_request;
pub mod session;
pub mod setting;

use pc_common::error::AppError;
use sqlx::Row;

/// Maps a sqlx failure to `AppError`, turning unique violations into conflicts.
pub(crate) fn storage_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::Conflict(context.to_string()),
        _ => AppError::External(format!("{context}: {e}")),
    }
}

pub(crate) fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::External(format!("read {name} failed: {e}")))
}

pub(crate) fn parse_uuid(raw: &str, name: &str) -> Result<uuid::Uuid, AppError> {
    uuid::Uuid::parse_str(raw)
        .map_err(|e| AppError::External(format!("invalid {name} uuid: {e}")))
}
