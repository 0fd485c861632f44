use chrono::{DateTime, Utc};
use pc_common::error::{AppError, AppResult};
use pc_common::rate_request::RateChangeRequest;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{column, parse_uuid, storage_error};

/// Review queue for submitted rate-change requests.
#[derive(Clone)]
pub struct RateRequestStore {
    pool: SqlitePool,
}

impl RateRequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, request: &RateChangeRequest) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO rate_change_requests \
             (request_id, account_id, category, proposed_rate, justification, submitted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(request.id.to_string())
        .bind(request.account_id.to_string())
        .bind(&request.category)
        .bind(request.proposed_rate)
        .bind(&request.justification)
        .bind(request.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error("failed to store rate change request"))?;
        Ok(())
    }

    pub async fn list_all(&self) -> AppResult<Vec<RateChangeRequest>> {
        let rows = sqlx::query(&format!("{SELECT_REQUEST} ORDER BY submitted_at DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("failed to list rate change requests"))?;

        rows.into_iter().map(row_to_request).collect()
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> AppResult<Vec<RateChangeRequest>> {
        let rows = sqlx::query(&format!(
            "{SELECT_REQUEST} WHERE account_id = ?1 ORDER BY submitted_at DESC"
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("failed to list rate change requests"))?;

        rows.into_iter().map(row_to_request).collect()
    }
}

const SELECT_REQUEST: &str = "SELECT request_id, account_id, category, proposed_rate, \
     justification, submitted_at FROM rate_change_requests";

fn row_to_request(row: sqlx::sqlite::SqliteRow) -> AppResult<RateChangeRequest> {
    let request_id: String = column(&row, "request_id")?;
    let account_id: String = column(&row, "account_id")?;
    let submitted_at: String = column(&row, "submitted_at")?;

    Ok(RateChangeRequest {
        id: parse_uuid(&request_id, "request_id")?,
        account_id: parse_uuid(&account_id, "account_id")?,
        category: column(&row, "category")?,
        proposed_rate: column(&row, "proposed_rate")?,
        justification: column(&row, "justification")?,
        submitted_at: DateTime::parse_from_rfc3339(&submitted_at)
            .map_err(|e| AppError::External(format!("invalid submitted_at: {e}")))?
            .with_timezone(&Utc),
    })
}
