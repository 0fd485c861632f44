//! Tier progress and month-over-month earnings movement.
//!
//! These are display metrics: degenerate input (empty ladders, missing
//! history, zero thresholds) yields a defined sentinel, never an error.

use serde::{Deserialize, Serialize};

use crate::earnings::EarningsRecord;
use crate::settings::RateSettings;
use crate::tiers::{qualifying_index, Tier, TierLadder};

/// Percentage progress from the current tier toward the next one, in `[0, 100]`.
///
/// The last tier always reports 100, as does a next tier with a zero threshold.
/// When no tier is flagged current, the current tier is derived from revenue.
pub fn compute_next_tier_progress(tiers: &[Tier], cumulative_revenue_cents: i64) -> f64 {
    if tiers.is_empty() {
        return 0.0;
    }

    let current = tiers
        .iter()
        .position(|t| t.is_current)
        .unwrap_or_else(|| qualifying_index(tiers, cumulative_revenue_cents));

    let Some(next) = tiers.get(current + 1) else {
        return 100.0;
    };
    if next.min_revenue_cents <= 0 {
        return 100.0;
    }

    let progress = cumulative_revenue_cents as f64 * 100.0 / next.min_revenue_cents as f64;
    progress.clamp(0.0, 100.0)
}

/// Total earnings of `series`, saturating at `i64::MAX`.
pub fn cumulative_revenue_cents(series: &[EarningsRecord]) -> i64 {
    series
        .iter()
        .fold(0_i64, |acc, r| acc.saturating_add(r.earnings_cents))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EarningsDelta {
    /// Fewer than two periods on record.
    InsufficientHistory,
    Change {
        amount_cents: i64,
        direction: Direction,
        /// `None` when the earlier period earned nothing.
        percent_change: Option<f64>,
    },
}

/// Compares the two most recent periods of `series`, in chronological order
/// regardless of input order. A flat month reports `Up` with a zero amount.
pub fn month_over_month_delta(series: &[EarningsRecord]) -> EarningsDelta {
    if series.len() < 2 {
        return EarningsDelta::InsufficientHistory;
    }

    let mut ordered: Vec<&EarningsRecord> = series.iter().collect();
    ordered.sort_by_key(|r| r.period);
    let latest = ordered[ordered.len() - 1];
    let prior = ordered[ordered.len() - 2];

    let diff = latest.earnings_cents.saturating_sub(prior.earnings_cents);
    let percent_change = if prior.earnings_cents == 0 {
        None
    } else {
        Some(diff as f64 * 100.0 / prior.earnings_cents as f64)
    };

    EarningsDelta::Change {
        amount_cents: diff.saturating_abs(),
        direction: if diff >= 0 {
            Direction::Up
        } else {
            Direction::Down
        },
        percent_change,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub current_tier: Tier,
    /// Base plus bonus of the current tier, the rate a partner earns today.
    pub current_effective_rate: f64,
    pub next_tier: Option<Tier>,
    pub cumulative_revenue_cents: i64,
    /// Revenue still needed to reach the next tier; zero at the top tier.
    pub remaining_to_next_cents: i64,
    pub progress_percent: f64,
    pub delta: EarningsDelta,
}

/// Derives tier standing from an earnings history, using explicitly supplied
/// rate settings.
#[derive(Debug, Clone)]
pub struct ProgressEngine {
    settings: RateSettings,
}

impl ProgressEngine {
    pub fn new(settings: RateSettings) -> Self {
        Self { settings }
    }

    /// The ladder with the current tier marked for `cumulative_revenue_cents`.
    pub fn ladder_for(&self, cumulative_revenue_cents: i64) -> TierLadder {
        TierLadder::from_settings(&self.settings).with_current_for_revenue(cumulative_revenue_cents)
    }

    pub fn report(&self, series: &[EarningsRecord]) -> ProgressReport {
        let cumulative = cumulative_revenue_cents(series);
        let ladder = self.ladder_for(cumulative);
        let next_tier = ladder.next().cloned();
        let remaining = next_tier
            .as_ref()
            .map(|t| t.min_revenue_cents.saturating_sub(cumulative).max(0))
            .unwrap_or(0);

        ProgressReport {
            current_effective_rate: ladder.current().effective_rate(),
            current_tier: ladder.current().clone(),
            next_tier,
            cumulative_revenue_cents: cumulative,
            remaining_to_next_cents: remaining,
            progress_percent: compute_next_tier_progress(ladder.tiers(), cumulative),
            delta: month_over_month_delta(series),
        }
    }
}
