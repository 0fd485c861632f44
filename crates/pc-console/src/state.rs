use pc_common::earnings::EarningsBasis;
use sqlx::SqlitePool;

use crate::stores::setting::SettingsStore;

#[derive(Clone)]
pub struct AppState {
    pub boot_id: String,
    pub git_sha: Option<String>,
    pub admin_password: Option<String>,
    pub db_pool: SqlitePool,
    pub settings: SettingsStore,
    pub earnings_basis: EarningsBasis,
}

impl AppState {
    pub fn new(
        boot_id: String,
        git_sha: Option<String>,
        admin_password: Option<String>,
        db_pool: SqlitePool,
        settings: SettingsStore,
    ) -> Self {
        Self {
            boot_id,
            git_sha,
            admin_password,
            db_pool,
            settings,
            earnings_basis: EarningsBasis::default(),
        }
    }
}
