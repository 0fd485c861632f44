use std::collections::HashMap;
use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use pc_common::error::{AppError, AppResult};
use pc_common::settings::{env_key_for, RateSettings};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use super::{column, storage_error};

/// Settings provider: database row, then env var, then built-in default.
/// Database values are cached as one snapshot for `ttl`.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
    ttl: Duration,
    cache: Arc<RwLock<Option<CachedSettings>>>,
}

#[derive(Clone)]
struct CachedSettings {
    loaded_at: Instant,
    by_key: HashMap<String, Value>,
}

impl SettingsStore {
    pub fn new_with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn rate_settings(&self) -> AppResult<RateSettings> {
        let db_values = self.cached_db_values().await?;
        Ok(RateSettings::from_values(|key| {
            resolve_value(key, &db_values, &|env_key| env::var(env_key).ok())
        }))
    }

    /// Writes every rate key in one transaction after strict validation.
    pub async fn put_rate_settings(&self, settings: &RateSettings) -> AppResult<()> {
        settings.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("failed to begin settings write"))?;
        for (key, value) in settings.to_values() {
            sqlx::query(UPSERT_SETTING)
                .bind(key)
                .bind(serialize(&value)?)
                .bind(0_i64)
                .execute(&mut *tx)
                .await
                .map_err(storage_error("failed to write rate setting"))?;
        }
        tx.commit()
            .await
            .map_err(storage_error("failed to commit rate settings"))?;

        self.invalidate_cache();
        info!(
            standard_rate = settings.standard_rate,
            premium_rate = settings.premium_rate,
            enterprise_rate = settings.enterprise_rate,
            bonuses_enabled = settings.performance_bonuses.enabled,
            "rate settings updated"
        );
        Ok(())
    }

    fn invalidate_cache(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn cached_db_values(&self) -> AppResult<HashMap<String, Value>> {
        if let Some(snapshot) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            if snapshot.loaded_at.elapsed() < self.ttl {
                return Ok(snapshot.by_key.clone());
            }
        }

        let values = self.load_all_db_values().await?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedSettings {
            loaded_at: Instant::now(),
            by_key: values.clone(),
        });
        Ok(values)
    }

    async fn load_all_db_values(&self) -> AppResult<HashMap<String, Value>> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("failed to load settings"))?;

        let mut by_key = HashMap::new();
        for row in rows {
            let key: String = column(&row, "key")?;
            let raw_value: String = column(&row, "value")?;
            let parsed =
                serde_json::from_str::<Value>(&raw_value).unwrap_or(Value::String(raw_value));
            by_key.insert(key, parsed);
        }

        Ok(by_key)
    }
}

const UPSERT_SETTING: &str = "INSERT INTO settings (key, value, is_secret, updated_at) \
     VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, is_secret = excluded.is_secret, updated_at = CURRENT_TIMESTAMP";

fn serialize(value: &Value) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::InvalidInput(format!("setting value serialize failed: {e}")))
}

fn resolve_value<F>(key: &str, db_values: &HashMap<String, Value>, env_get: &F) -> Option<Value>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = db_values.get(key) {
        return Some(v.clone());
    }

    if let Some(env_key) = env_key_for(key) {
        if let Some(raw) = env_get(env_key) {
            if let Ok(v) = serde_json::from_str::<Value>(&raw) {
                return Some(v);
            }
            return Some(Value::String(raw));
        }
    }

    RateSettings::default()
        .to_values()
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}
