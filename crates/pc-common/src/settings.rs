//! Commission rate settings consumed by the tier ladder and progress engine.
//!
//! Settings arrive as loosely typed key/value pairs (database rows, env vars);
//! [`RateSettings::from_values`] resolves them leniently so a bad row degrades
//! to the built-in default instead of failing a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ensure_percentage, AppResult};

pub const STANDARD_RATE_KEY: &str = "rates.standard";
pub const PREMIUM_RATE_KEY: &str = "rates.premium";
pub const ENTERPRISE_RATE_KEY: &str = "rates.enterprise";
pub const BONUSES_ENABLED_KEY: &str = "bonuses.enabled";
pub const ENGAGEMENT_BONUS_KEY: &str = "bonuses.engagement";
pub const RETENTION_BONUS_KEY: &str = "bonuses.retention";

pub const RATE_KEYS: [&str; 6] = [
    STANDARD_RATE_KEY,
    PREMIUM_RATE_KEY,
    ENTERPRISE_RATE_KEY,
    BONUSES_ENABLED_KEY,
    ENGAGEMENT_BONUS_KEY,
    RETENTION_BONUS_KEY,
];

pub const DEFAULT_STANDARD_RATE: f64 = 70.0;
pub const DEFAULT_PREMIUM_RATE: f64 = 80.0;
pub const DEFAULT_ENTERPRISE_RATE: f64 = 85.0;
pub const DEFAULT_ENGAGEMENT_BONUS: f64 = 2.5;
pub const DEFAULT_RETENTION_BONUS: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBonuses {
    pub enabled: bool,
    pub engagement_bonus: f64,
    pub retention_bonus: f64,
}

impl Default for PerformanceBonuses {
    fn default() -> Self {
        Self {
            enabled: true,
            engagement_bonus: DEFAULT_ENGAGEMENT_BONUS,
            retention_bonus: DEFAULT_RETENTION_BONUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSettings {
    pub standard_rate: f64,
    pub premium_rate: f64,
    pub enterprise_rate: f64,
    pub performance_bonuses: PerformanceBonuses,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            standard_rate: DEFAULT_STANDARD_RATE,
            premium_rate: DEFAULT_PREMIUM_RATE,
            enterprise_rate: DEFAULT_ENTERPRISE_RATE,
            performance_bonuses: PerformanceBonuses::default(),
        }
    }
}

impl RateSettings {
    /// Builds settings from a key lookup. Missing or malformed keys use defaults.
    pub fn from_values<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Value>,
    {
        let defaults = Self::default();
        Self {
            standard_rate: percent(&lookup, STANDARD_RATE_KEY, defaults.standard_rate),
            premium_rate: percent(&lookup, PREMIUM_RATE_KEY, defaults.premium_rate),
            enterprise_rate: percent(&lookup, ENTERPRISE_RATE_KEY, defaults.enterprise_rate),
            performance_bonuses: PerformanceBonuses {
                enabled: flag(
                    &lookup,
                    BONUSES_ENABLED_KEY,
                    defaults.performance_bonuses.enabled,
                ),
                engagement_bonus: percent(
                    &lookup,
                    ENGAGEMENT_BONUS_KEY,
                    defaults.performance_bonuses.engagement_bonus,
                ),
                retention_bonus: percent(
                    &lookup,
                    RETENTION_BONUS_KEY,
                    defaults.performance_bonuses.retention_bonus,
                ),
            },
        }
    }

    /// Strict check used when an admin writes new settings.
    pub fn validate(&self) -> AppResult<()> {
        ensure_percentage("standard_rate", self.standard_rate)?;
        ensure_percentage("premium_rate", self.premium_rate)?;
        ensure_percentage("enterprise_rate", self.enterprise_rate)?;
        ensure_percentage(
            "performance_bonuses.engagement_bonus",
            self.performance_bonuses.engagement_bonus,
        )?;
        ensure_percentage(
            "performance_bonuses.retention_bonus",
            self.performance_bonuses.retention_bonus,
        )?;
        Ok(())
    }

    /// Key/value pairs in the shape the settings store persists.
    pub fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            (STANDARD_RATE_KEY, Value::from(self.standard_rate)),
            (PREMIUM_RATE_KEY, Value::from(self.premium_rate)),
            (ENTERPRISE_RATE_KEY, Value::from(self.enterprise_rate)),
            (
                BONUSES_ENABLED_KEY,
                Value::Bool(self.performance_bonuses.enabled),
            ),
            (
                ENGAGEMENT_BONUS_KEY,
                Value::from(self.performance_bonuses.engagement_bonus),
            ),
            (
                RETENTION_BONUS_KEY,
                Value::from(self.performance_bonuses.retention_bonus),
            ),
        ]
    }
}

/// Env var consulted when a rate key has no database row.
pub fn env_key_for(key: &str) -> Option<&'static str> {
    match key {
        STANDARD_RATE_KEY => Some("PC_STANDARD_RATE"),
        PREMIUM_RATE_KEY => Some("PC_PREMIUM_RATE"),
        ENTERPRISE_RATE_KEY => Some("PC_ENTERPRISE_RATE"),
        BONUSES_ENABLED_KEY => Some("PC_BONUSES_ENABLED"),
        ENGAGEMENT_BONUS_KEY => Some("PC_ENGAGEMENT_BONUS"),
        RETENTION_BONUS_KEY => Some("PC_RETENTION_BONUS"),
        _ => None,
    }
}

fn percent<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<Value>,
{
    let Some(value) = lookup(key) else {
        return default;
    };
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(rate) if rate.is_finite() && (0.0..=100.0).contains(&rate) => rate,
        _ => {
            warn!(key, %value, default, "ignoring invalid rate setting");
            default
        }
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<Value>,
{
    match lookup(key) {
        None => default,
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!(key, value = %s, default, "ignoring invalid flag setting");
                default
            }
        },
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(default),
        Some(other) => {
            warn!(key, value = %other, default, "ignoring invalid flag setting");
            default
        }
    }
}
