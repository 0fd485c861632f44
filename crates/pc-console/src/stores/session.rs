use chrono::{DateTime, Duration, Utc};
use pc_common::error::{AppError, AppResult};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{column, parse_uuid, storage_error};

const SESSION_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub token_hash: String,
    pub token_prefix: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, token_hash: &str, token_prefix: &str) -> AppResult<SessionRecord> {
        let session_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(SESSION_LIFETIME_HOURS);

        sqlx::query(
            "INSERT INTO admin_sessions (session_id, token_hash, token_prefix, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id.to_string())
        .bind(token_hash)
        .bind(token_prefix)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error("failed to create session"))?;

        Ok(SessionRecord {
            session_id,
            token_hash: token_hash.to_string(),
            token_prefix: token_prefix.to_string(),
            expires_at,
        })
    }

    /// Every session sharing `prefix`, newest first.
    pub async fn list_by_prefix(&self, prefix: &str) -> AppResult<Vec<SessionRecord>> {
        let rows = sqlx::query(
            "SELECT session_id, token_hash, token_prefix, expires_at \
             FROM admin_sessions WHERE token_prefix = ?1 ORDER BY created_at DESC",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("failed to lookup sessions"))?;

        rows.into_iter().map(row_to_session).collect()
    }

    pub async fn delete(&self, session_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM admin_sessions WHERE session_id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_error("failed to delete session"))?;
        Ok(())
    }

    /// Removes sessions past their expiry. Returns the number removed.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(storage_error("failed to delete expired sessions"))?;
        Ok(result.rows_affected())
    }
}

fn row_to_session(row: sqlx::sqlite::SqliteRow) -> AppResult<SessionRecord> {
    let session_id: String = column(&row, "session_id")?;
    let expires_at: String = column(&row, "expires_at")?;

    Ok(SessionRecord {
        session_id: parse_uuid(&session_id, "session_id")?,
        token_hash: column(&row, "token_hash")?,
        token_prefix: column(&row, "token_prefix")?,
        expires_at: DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| AppError::External(format!("invalid expires_at: {e}")))?
            .with_timezone(&Utc),
    })
}
