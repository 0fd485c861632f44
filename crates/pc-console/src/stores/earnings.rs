use pc_common::earnings::EarningsRecord;
use pc_common::error::{AppError, AppResult};
use pc_common::types::Period;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::{column, parse_uuid, storage_error};

/// A stored earnings record with its ledger metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub record_id: Uuid,
    pub account_id: Uuid,
    pub category: String,
    #[serde(flatten)]
    pub record: EarningsRecord,
    pub created_at: String,
}

/// Append-only earnings ledger; recorded rows are never updated.
#[derive(Clone)]
pub struct EarningsStore {
    pool: SqlitePool,
}

impl EarningsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        account_id: Uuid,
        category: &str,
        record: &EarningsRecord,
    ) -> AppResult<LedgerEntry> {
        let record_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO earnings \
             (record_id, account_id, category, period, earnings_cents, impressions, engagements, rate) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(record_id.to_string())
        .bind(account_id.to_string())
        .bind(category)
        .bind(record.period.to_string())
        .bind(record.earnings_cents)
        .bind(to_db_count(record.impressions, "impressions")?)
        .bind(to_db_count(record.engagements, "engagements")?)
        .bind(record.rate)
        .execute(&self.pool)
        .await
        .map_err(storage_error(
            "earnings already recorded for this category and period",
        ))?;

        info!(
            %account_id,
            category,
            period = %record.period,
            earnings_cents = record.earnings_cents,
            rate = record.rate,
            "earnings recorded"
        );

        let row = sqlx::query(&format!("{SELECT_ENTRY} WHERE record_id = ?1"))
            .bind(record_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error("failed to read back earnings record"))?;
        row_to_entry(row)
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENTRY} WHERE account_id = ?1 ORDER BY period ASC, category ASC"
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("failed to list earnings"))?;

        rows.into_iter().map(row_to_entry).collect()
    }

    pub async fn records_for_account(&self, account_id: Uuid) -> AppResult<Vec<EarningsRecord>> {
        Ok(self
            .list_for_account(account_id)
            .await?
            .into_iter()
            .map(|entry| entry.record)
            .collect())
    }
}

const SELECT_ENTRY: &str = "SELECT record_id, account_id, category, period, earnings_cents, \
     impressions, engagements, rate, created_at FROM earnings";

fn to_db_count(value: u64, name: &str) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::InvalidInput(format!("{name} is too large")))
}

fn from_db_count(value: i64, name: &str) -> AppResult<u64> {
    u64::try_from(value).map_err(|_| AppError::External(format!("negative {name} in ledger")))
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> AppResult<LedgerEntry> {
    let record_id: String = column(&row, "record_id")?;
    let account_id: String = column(&row, "account_id")?;
    let period: String = column(&row, "period")?;
    let period: Period = period
        .parse()
        .map_err(|_| AppError::External(format!("invalid period in ledger: {period}")))?;

    Ok(LedgerEntry {
        record_id: parse_uuid(&record_id, "record_id")?,
        account_id: parse_uuid(&account_id, "account_id")?,
        category: column(&row, "category")?,
        record: EarningsRecord {
            period,
            earnings_cents: column(&row, "earnings_cents")?,
            impressions: from_db_count(column(&row, "impressions")?, "impressions")?,
            engagements: from_db_count(column(&row, "engagements")?, "engagements")?,
            rate: column(&row, "rate")?,
        },
        created_at: column(&row, "created_at")?,
    })
}
