use pc_common::error::{AppError, AppResult};
use pc_common::types::Role;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::{column, parse_uuid, storage_error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub account_id: Uuid,
    pub name: String,
    pub role: Role,
    pub created_at: String,
}

/// Credentials row used to authenticate an API key.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountAuth {
    pub account_id: Uuid,
    pub role: Role,
    pub api_key_hash: String,
}

#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        role: Role,
        api_key_hash: &str,
        api_key_prefix: &str,
    ) -> AppResult<AccountRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("account name is required".to_string()));
        }

        let account_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO accounts (account_id, name, role, api_key_hash, api_key_prefix) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(account_id.to_string())
        .bind(name)
        .bind(role.as_str())
        .bind(api_key_hash)
        .bind(api_key_prefix)
        .execute(&self.pool)
        .await
        .map_err(storage_error("account name already exists"))?;

        info!(%account_id, %role, "account created");
        self.get(account_id).await?.ok_or(AppError::NotFound)
    }

    pub async fn get(&self, account_id: Uuid) -> AppResult<Option<AccountRecord>> {
        let row = sqlx::query(
            "SELECT account_id, name, role, created_at FROM accounts WHERE account_id = ?1",
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("failed to fetch account"))?;

        row.map(row_to_account).transpose()
    }

    pub async fn list(&self) -> AppResult<Vec<AccountRecord>> {
        let rows = sqlx::query(
            "SELECT account_id, name, role, created_at FROM accounts ORDER BY created_at DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("failed to list accounts"))?;

        rows.into_iter().map(row_to_account).collect()
    }

    pub async fn lookup_auth_by_prefix(&self, key_prefix: &str) -> AppResult<Option<AccountAuth>> {
        let row = sqlx::query(
            "SELECT account_id, role, api_key_hash FROM accounts WHERE api_key_prefix = ?1",
        )
        .bind(key_prefix)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("failed to lookup account by key prefix"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let api_key_hash: Option<String> = column(&row, "api_key_hash")?;
        let Some(api_key_hash) = api_key_hash else {
            return Ok(None);
        };
        let account_id: String = column(&row, "account_id")?;
        let role: String = column(&row, "role")?;

        Ok(Some(AccountAuth {
            account_id: parse_uuid(&account_id, "account_id")?,
            role: role_from_db(&role)?,
            api_key_hash,
        }))
    }
}

fn row_to_account(row: sqlx::sqlite::SqliteRow) -> AppResult<AccountRecord> {
    let account_id: String = column(&row, "account_id")?;
    let role: String = column(&row, "role")?;

    Ok(AccountRecord {
        account_id: parse_uuid(&account_id, "account_id")?,
        name: column(&row, "name")?,
        role: role_from_db(&role)?,
        created_at: column(&row, "created_at")?,
    })
}

fn role_from_db(raw: &str) -> AppResult<Role> {
    raw.parse()
        .map_err(|_| AppError::External(format!("invalid account role: {raw}")))
}

#[cfg(test)]
mod tests {
    use pc_common::error::AppError;
    use pc_common::types::Role;

    use super::AccountStore;
    use crate::db::test_pool;

    #[tokio::test]
    async fn create_get_and_lookup_account() {
        let store = AccountStore::new(test_pool().await);
        let created = store
            .create("acme-media", Role::Partner, "hash", "pc_live_abcd")
            .await
            .expect("create");
        assert_eq!(created.role, Role::Partner);

        let fetched = store
            .get(created.account_id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(fetched.name, "acme-media");

        let auth = store
            .lookup_auth_by_prefix("pc_live_abcd")
            .await
            .expect("lookup")
            .expect("auth");
        assert_eq!(auth.account_id, created.account_id);
        assert_eq!(auth.api_key_hash, "hash");

        assert!(store
            .lookup_auth_by_prefix("pc_live_zzzz")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let store = AccountStore::new(test_pool().await);
        store
            .create("acme-media", Role::Partner, "hash", "pc_live_aaaa")
            .await
            .expect("first");
        let err = store
            .create("acme-media", Role::Advertiser, "hash", "pc_live_bbbb")
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn lists_all_accounts() {
        let store = AccountStore::new(test_pool().await);
        store
            .create("a", Role::Partner, "hash", "pc_live_0001")
            .await
            .expect("a");
        store
            .create("b", Role::Advertiser, "hash", "pc_live_0002")
            .await
            .expect("b");
        assert_eq!(store.list().await.expect("list").len(), 2);
    }
}
