use std::collections::HashMap;
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub admin_password: Option<String>,
    /// How long a settings snapshot is served before the store reloads it.
    pub settings_ttl_secs: u64,
    /// Interval of the background sweep that activates due pending rate assignments.
    pub promotion_interval_secs: u64,
}

impl ConsoleConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_map(&env_map())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> AppResult<Self> {
        Ok(Self {
            bind_addr: get(vars, "PC_BIND_ADDR", "0.0.0.0:8080"),
            database_url: get(
                vars,
                "PC_DATABASE_URL",
                "sqlite://partner-console.db?mode=rwc",
            ),
            admin_password: optional(vars, "PC_ADMIN_PASSWORD"),
            settings_ttl_secs: parse(vars, "PC_SETTINGS_TTL_SECS", 5)?,
            promotion_interval_secs: parse(vars, "PC_PROMOTION_INTERVAL_SECS", 60)?,
        })
    }
}

fn env_map() -> HashMap<String, String> {
    env::vars().collect()
}

fn get(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    vars.get(key)
        .cloned()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).cloned().filter(|v| !v.is_empty())
}

fn parse(vars: &HashMap<String, String>, key: &str, default: u64) -> AppResult<u64> {
    match optional(vars, key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer"))),
        None => Ok(default),
    }
}
