//! Commission tier ladder.
//!
//! A ladder is ordered ascending by revenue threshold and has exactly one
//! current tier. The built-in ladder is derived from [`RateSettings`] and
//! never fails to build.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_percentage, AppError, AppResult};
use crate::settings::RateSettings;

pub const PREMIUM_THRESHOLD_CENTS: i64 = 500_000;
pub const ENTERPRISE_THRESHOLD_CENTS: i64 = 1_500_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub min_revenue_cents: i64,
    pub base_rate: f64,
    pub bonus_rate: f64,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub is_current: bool,
}

impl Tier {
    /// Base plus bonus, capped at 100.
    pub fn effective_rate(&self) -> f64 {
        (self.base_rate + self.bonus_rate).min(100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TierLadder {
    tiers: Vec<Tier>,
}

impl TierLadder {
    /// Validates a custom ladder.
    pub fn new(tiers: Vec<Tier>) -> AppResult<Self> {
        if tiers.is_empty() {
            return Err(AppError::InvalidInput(
                "tier ladder must not be empty".to_string(),
            ));
        }

        for tier in &tiers {
            ensure_percentage(&format!("{} base_rate", tier.name), tier.base_rate)?;
            ensure_percentage(&format!("{} bonus_rate", tier.name), tier.bonus_rate)?;
            if tier.min_revenue_cents < 0 {
                return Err(AppError::InvalidInput(format!(
                    "{} min_revenue must be non-negative",
                    tier.name
                )));
            }
        }

        for pair in tiers.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.min_revenue_cents <= lower.min_revenue_cents {
                return Err(AppError::InvalidInput(format!(
                    "tier {} must require more revenue than {}",
                    upper.name, lower.name
                )));
            }
            if upper.base_rate < lower.base_rate {
                return Err(AppError::InvalidInput(format!(
                    "tier {} base_rate must not be lower than {}",
                    upper.name, lower.name
                )));
            }
        }

        let current = tiers.iter().filter(|t| t.is_current).count();
        if current != 1 {
            return Err(AppError::InvalidInput(format!(
                "exactly one tier must be current, found {current}"
            )));
        }

        Ok(Self { tiers })
    }

    /// Standard -> Premium -> Enterprise, with Standard current.
    pub fn from_settings(settings: &RateSettings) -> Self {
        let bonuses = settings.performance_bonuses;
        let (premium_bonus, enterprise_bonus) = if bonuses.enabled {
            (
                bonuses.engagement_bonus,
                bonuses.engagement_bonus + bonuses.retention_bonus,
            )
        } else {
            (0.0, 0.0)
        };

        // Settings are validated per key, not against each other; keep the
        // ladder monotonic even if an admin lowers a higher tier's rate.
        let standard = settings.standard_rate;
        let premium = settings.premium_rate.max(standard);
        let enterprise = settings.enterprise_rate.max(premium);

        Self {
            tiers: vec![
                Tier {
                    name: "Standard".to_string(),
                    min_revenue_cents: 0,
                    base_rate: standard,
                    bonus_rate: 0.0,
                    requirements: vec![
                        "Verified partner account".to_string(),
                        "Accepted publisher terms".to_string(),
                    ],
                    benefits: vec![
                        format!("{standard}% revenue share"),
                        "Monthly payouts".to_string(),
                    ],
                    is_current: true,
                },
                Tier {
                    name: "Premium".to_string(),
                    min_revenue_cents: PREMIUM_THRESHOLD_CENTS,
                    base_rate: premium,
                    bonus_rate: premium_bonus.min(100.0 - premium),
                    requirements: vec![
                        "$5,000 cumulative revenue".to_string(),
                        "Brand-safety review passed".to_string(),
                    ],
                    benefits: vec![
                        format!("{premium}% revenue share"),
                        "Engagement performance bonus".to_string(),
                        "Priority support".to_string(),
                    ],
                    is_current: false,
                },
                Tier {
                    name: "Enterprise".to_string(),
                    min_revenue_cents: ENTERPRISE_THRESHOLD_CENTS,
                    base_rate: enterprise,
                    bonus_rate: enterprise_bonus.min(100.0 - enterprise),
                    requirements: vec![
                        "$15,000 cumulative revenue".to_string(),
                        "Dedicated inventory commitment".to_string(),
                    ],
                    benefits: vec![
                        format!("{enterprise}% revenue share"),
                        "Engagement and retention bonuses".to_string(),
                        "Dedicated account manager".to_string(),
                    ],
                    is_current: false,
                },
            ],
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn into_tiers(self) -> Vec<Tier> {
        self.tiers
    }

    pub fn current_index(&self) -> usize {
        // the constructors guarantee exactly one current tier
        self.tiers.iter().position(|t| t.is_current).unwrap_or(0)
    }

    pub fn current(&self) -> &Tier {
        &self.tiers[self.current_index()]
    }

    pub fn next(&self) -> Option<&Tier> {
        self.tiers.get(self.current_index() + 1)
    }

    pub fn find(&self, name: &str) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Re-marks the current tier as the highest one whose threshold is met.
    pub fn with_current_for_revenue(mut self, cumulative_revenue_cents: i64) -> Self {
        let index = qualifying_index(&self.tiers, cumulative_revenue_cents);
        for (i, tier) in self.tiers.iter_mut().enumerate() {
            tier.is_current = i == index;
        }
        self
    }
}

/// Highest tier whose threshold is met; the first tier when none is.
pub(crate) fn qualifying_index(tiers: &[Tier], cumulative_revenue_cents: i64) -> usize {
    tiers
        .iter()
        .rposition(|t| cumulative_revenue_cents >= t.min_revenue_cents)
        .unwrap_or(0)
}
