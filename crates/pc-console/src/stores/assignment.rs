use chrono::NaiveDate;
use pc_common::assignment::{AssignmentChanges, NewAssignment, RateAssignment, RateBook};
use pc_common::error::{AppError, AppResult};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::warn;
use uuid::Uuid;

use super::{column, parse_uuid, storage_error};

/// Persists per-account rate books. Every mutation loads the book, applies the
/// change through [`RateBook`], and writes the changed rows in one transaction.
#[derive(Clone)]
pub struct AssignmentStore {
    pool: SqlitePool,
}

impl AssignmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn book(&self, account_id: Uuid) -> AppResult<RateBook> {
        let rows = sqlx::query(SELECT_FOR_ACCOUNT)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("failed to load rate assignments"))?;

        let assignments = rows
            .into_iter()
            .map(row_to_assignment)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(RateBook::new(assignments))
    }

    pub async fn assign(
        &self,
        account_id: Uuid,
        new: NewAssignment,
        today: NaiveDate,
    ) -> AppResult<AssignmentChanges> {
        let mut tx = self.begin().await?;
        let mut book = load_book(&mut tx, account_id).await?;
        let changes = book.assign(new, today)?;
        write_changes(&mut tx, account_id, &changes).await?;
        tx.commit()
            .await
            .map_err(storage_error("failed to commit rate assignment"))?;
        Ok(changes)
    }

    /// Activates due pending assignments across all accounts. Returns the
    /// number of rows changed. An account that fails is logged and skipped.
    pub async fn promote_due(&self, today: NaiveDate) -> AppResult<usize> {
        let rows = sqlx::query(
            "SELECT DISTINCT account_id FROM rate_assignments \
             WHERE status = 'pending' AND effective_from <= ?1",
        )
        .bind(today.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("failed to find due assignments"))?;

        let mut changed = 0;
        for row in rows {
            let raw_id: String = column(&row, "account_id")?;
            let account_id = match parse_uuid(&raw_id, "account_id") {
                Ok(id) => id,
                Err(err) => {
                    warn!(account_id = %raw_id, error = %err, "skipping unreadable account");
                    continue;
                }
            };

            match self.promote_account(account_id, today).await {
                Ok(count) => changed += count,
                Err(err) => {
                    warn!(%account_id, error = %err, "rate assignment promotion failed for account")
                }
            }
        }
        Ok(changed)
    }

    async fn promote_account(&self, account_id: Uuid, today: NaiveDate) -> AppResult<usize> {
        let mut tx = self.begin().await?;
        let mut book = load_book(&mut tx, account_id).await?;
        let changes = book.promote_due(today);
        write_changes(&mut tx, account_id, &changes).await?;
        tx.commit()
            .await
            .map_err(storage_error("failed to commit promotion"))?;
        Ok(changes.changed.len())
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(storage_error("failed to begin transaction"))
    }
}

const SELECT_FOR_ACCOUNT: &str = "SELECT assignment_id, category, rate, tier, effective_from, \
     effective_to, status FROM rate_assignments WHERE account_id = ?1 \
     ORDER BY category ASC, effective_from ASC";

async fn load_book(tx: &mut Transaction<'static, Sqlite>, account_id: Uuid) -> AppResult<RateBook> {
    let rows = sqlx::query(SELECT_FOR_ACCOUNT)
        .bind(account_id.to_string())
        .fetch_all(&mut **tx)
        .await
        .map_err(storage_error("failed to load rate assignments"))?;

    let assignments = rows
        .into_iter()
        .map(row_to_assignment)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(RateBook::new(assignments))
}

/// Writes rows in change order so an expiring assignment is closed before its
/// successor takes the open-active slot.
async fn write_changes(
    tx: &mut Transaction<'static, Sqlite>,
    account_id: Uuid,
    changes: &AssignmentChanges,
) -> AppResult<()> {
    for assignment in &changes.changed {
        sqlx::query(
            "INSERT INTO rate_assignments \
             (assignment_id, account_id, category, rate, tier, effective_from, effective_to, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(assignment_id) DO UPDATE SET \
             effective_to = excluded.effective_to, status = excluded.status, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(assignment.id.to_string())
        .bind(account_id.to_string())
        .bind(&assignment.category)
        .bind(assignment.rate)
        .bind(&assignment.tier)
        .bind(assignment.effective_from.to_string())
        .bind(assignment.effective_to.map(|d| d.to_string()))
        .bind(assignment.status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(storage_error(
            "another active assignment exists for this category",
        ))?;
    }
    Ok(())
}

fn row_to_assignment(row: sqlx::sqlite::SqliteRow) -> AppResult<RateAssignment> {
    let assignment_id: String = column(&row, "assignment_id")?;
    let effective_from: String = column(&row, "effective_from")?;
    let effective_to: Option<String> = column(&row, "effective_to")?;
    let status: String = column(&row, "status")?;

    Ok(RateAssignment {
        id: parse_uuid(&assignment_id, "assignment_id")?,
        category: column(&row, "category")?,
        rate: column(&row, "rate")?,
        tier: column(&row, "tier")?,
        effective_from: parse_date(&effective_from)?,
        effective_to: effective_to.as_deref().map(parse_date).transpose()?,
        status: status.parse()?,
    })
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    raw.parse()
        .map_err(|e| AppError::External(format!("invalid assignment date {raw}: {e}")))
}
