//! Monthly earnings records.
//!
//! A record's earnings are fixed when it is generated; later rate changes
//! never rewrite history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assignment::RateBook;
use crate::error::{ensure_percentage, AppError, AppResult};
use crate::types::Period;

pub const DEFAULT_CPM_CENTS: i64 = 250;
pub const DEFAULT_ENGAGEMENT_CENTS: i64 = 4;

/// Largest gross amount one record may carry. Keeps every stored amount
/// exactly representable as `f64` and far from `i64` overflow when summed.
pub const MAX_RECORD_CENTS: i64 = 1 << 53;

/// Prices used to turn delivery counts into gross (pre-commission) earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsBasis {
    /// Gross revenue per thousand impressions.
    pub cpm_cents: i64,
    pub engagement_cents: i64,
}

impl Default for EarningsBasis {
    fn default() -> Self {
        Self {
            cpm_cents: DEFAULT_CPM_CENTS,
            engagement_cents: DEFAULT_ENGAGEMENT_CENTS,
        }
    }
}

impl EarningsBasis {
    pub fn base_cents(&self, impressions: u64, engagements: u64) -> AppResult<i64> {
        if self.cpm_cents < 0 || self.engagement_cents < 0 {
            return Err(AppError::InvalidInput(
                "earnings basis prices must be non-negative".to_string(),
            ));
        }
        let base = (impressions as f64 * self.cpm_cents as f64 / 1000.0
            + engagements as f64 * self.engagement_cents as f64)
            .round();
        if !base.is_finite() || base > MAX_RECORD_CENTS as f64 {
            return Err(AppError::InvalidInput(
                "delivery counts exceed the maximum earnings per record".to_string(),
            ));
        }
        Ok(base as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsRecord {
    pub period: Period,
    pub earnings_cents: i64,
    pub impressions: u64,
    pub engagements: u64,
    pub rate: f64,
}

impl EarningsRecord {
    pub fn generate(
        period: Period,
        impressions: u64,
        engagements: u64,
        rate: f64,
        basis: &EarningsBasis,
    ) -> AppResult<Self> {
        ensure_percentage("rate", rate)?;
        let base = basis.base_cents(impressions, engagements)?;
        let earnings_cents = (base as f64 * rate / 100.0).round() as i64;

        Ok(Self {
            period,
            earnings_cents,
            impressions,
            engagements,
            rate,
        })
    }
}

/// Delivery counts for one month, before any rate is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodActivity {
    pub period: Period,
    pub impressions: u64,
    pub engagements: u64,
}

/// Builds a chronological series, pricing each month at the rate in effect on
/// its first day, or `fallback_rate` when no assignment covers it.
pub fn generate_series(
    book: &RateBook,
    category: &str,
    activity: &[PeriodActivity],
    basis: &EarningsBasis,
    fallback_rate: f64,
) -> AppResult<Vec<EarningsRecord>> {
    let mut ordered = activity.to_vec();
    ordered.sort_by_key(|a| a.period);

    ordered
        .into_iter()
        .map(|a| {
            let rate = book
                .rate_on(category, a.period.first_day())
                .unwrap_or(fallback_rate);
            EarningsRecord::generate(a.period, a.impressions, a.engagements, rate, basis)
        })
        .collect()
}

/// Folds per-category records into one record per period, chronologically.
/// The folded rate is the earnings-weighted mean of the inputs. Sums
/// saturate at the integer maximum.
pub fn monthly_totals(records: &[EarningsRecord]) -> Vec<EarningsRecord> {
    let mut by_period: BTreeMap<Period, Vec<&EarningsRecord>> = BTreeMap::new();
    for record in records {
        by_period.entry(record.period).or_default().push(record);
    }

    by_period
        .into_iter()
        .map(|(period, group)| {
            let earnings_cents = group
                .iter()
                .fold(0_i64, |acc, r| acc.saturating_add(r.earnings_cents));
            let rate = if earnings_cents > 0 {
                group
                    .iter()
                    .map(|r| r.rate * r.earnings_cents as f64)
                    .sum::<f64>()
                    / earnings_cents as f64
            } else {
                group.iter().map(|r| r.rate).sum::<f64>() / group.len() as f64
            };
            EarningsRecord {
                period,
                earnings_cents,
                impressions: group
                    .iter()
                    .fold(0_u64, |acc, r| acc.saturating_add(r.impressions)),
                engagements: group
                    .iter()
                    .fold(0_u64, |acc, r| acc.saturating_add(r.engagements)),
                rate,
            }
        })
        .collect()
}
