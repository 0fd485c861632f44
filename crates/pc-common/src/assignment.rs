//! Time-bounded rate assignments per ad category.
//!
//! For a given category at most one assignment is `Active` with an open end
//! date. Replacing it goes through [`supersede`], which closes the old window
//! at the new assignment's start.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ensure_percentage, AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Pending,
    Expired,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "active" => Ok(AssignmentStatus::Active),
            "pending" => Ok(AssignmentStatus::Pending),
            "expired" => Ok(AssignmentStatus::Expired),
            _ => Err(AppError::External(format!(
                "invalid assignment status: {raw}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAssignment {
    pub id: Uuid,
    pub category: String,
    pub rate: f64,
    pub tier: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub status: AssignmentStatus,
}

impl RateAssignment {
    pub fn is_open_active(&self) -> bool {
        self.status == AssignmentStatus::Active && self.effective_to.is_none()
    }

    /// True when `date` falls in `[effective_from, effective_to)`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.status != AssignmentStatus::Pending
            && self.effective_from <= date
            && self.effective_to.map_or(true, |end| date < end)
    }

    fn is_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub category: String,
    pub rate: f64,
    pub tier: String,
    pub effective_from: NaiveDate,
}

impl NewAssignment {
    fn validate(&self) -> AppResult<()> {
        if self.category.trim().is_empty() {
            return Err(AppError::InvalidInput("category is required".to_string()));
        }
        if self.tier.trim().is_empty() {
            return Err(AppError::InvalidInput("tier is required".to_string()));
        }
        ensure_percentage("rate", self.rate)
    }

    fn into_assignment(self, status: AssignmentStatus) -> RateAssignment {
        RateAssignment {
            id: Uuid::new_v4(),
            category: self.category.trim().to_string(),
            rate: self.rate,
            tier: self.tier.trim().to_string(),
            effective_from: self.effective_from,
            effective_to: None,
            status,
        }
    }
}

/// Closes `old` at `new.effective_from` and returns `(expired_old, active_new)`.
pub fn supersede(
    old: &RateAssignment,
    new: NewAssignment,
) -> AppResult<(RateAssignment, RateAssignment)> {
    new.validate()?;

    if !old.is_open_active() {
        return Err(AppError::Conflict(format!(
            "assignment {} is not the open active assignment",
            old.id
        )));
    }
    if !old.is_category(&new.category) {
        return Err(AppError::InvalidInput(format!(
            "cannot supersede {} assignment with {}",
            old.category, new.category
        )));
    }
    if new.effective_from < old.effective_from {
        return Err(AppError::InvalidInput(format!(
            "new assignment must start on or after {}",
            old.effective_from
        )));
    }

    let mut expired = old.clone();
    expired.effective_to = Some(new.effective_from);
    expired.status = AssignmentStatus::Expired;

    Ok((expired, new.into_assignment(AssignmentStatus::Active)))
}

/// Records written by a [`RateBook`] mutation, in write order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssignmentChanges {
    pub changed: Vec<RateAssignment>,
}

impl AssignmentChanges {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// All rate assignments of one account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateBook {
    assignments: Vec<RateAssignment>,
}

impl RateBook {
    pub fn new(assignments: Vec<RateAssignment>) -> Self {
        Self { assignments }
    }

    pub fn assignments(&self) -> &[RateAssignment] {
        &self.assignments
    }

    pub fn active_for(&self, category: &str) -> Option<&RateAssignment> {
        self.assignments
            .iter()
            .find(|a| a.is_category(category) && a.is_open_active())
    }

    pub fn rate_on(&self, category: &str, date: NaiveDate) -> Option<f64> {
        self.assignments
            .iter()
            .filter(|a| a.is_category(category) && a.covers(date))
            .max_by_key(|a| a.effective_from)
            .map(|a| a.rate)
    }

    /// Applies a new assignment as of `today`. Future-dated assignments are
    /// queued as pending; others supersede the category's active assignment.
    pub fn assign(&mut self, new: NewAssignment, today: NaiveDate) -> AppResult<AssignmentChanges> {
        new.validate()?;

        if new.effective_from > today {
            let pending = new.into_assignment(AssignmentStatus::Pending);
            info!(
                category = %pending.category,
                rate = pending.rate,
                effective_from = %pending.effective_from,
                "rate assignment scheduled"
            );
            self.assignments.push(pending.clone());
            return Ok(AssignmentChanges {
                changed: vec![pending],
            });
        }

        self.activate(new)
    }

    /// Activates pending assignments whose start date has arrived, oldest first.
    pub fn promote_due(&mut self, today: NaiveDate) -> AssignmentChanges {
        let mut due: Vec<RateAssignment> = self
            .assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Pending && a.effective_from <= today)
            .cloned()
            .collect();
        due.sort_by_key(|a| a.effective_from);

        let mut changes = AssignmentChanges::default();
        for pending in due {
            self.assignments.retain(|a| a.id != pending.id);
            let request = NewAssignment {
                category: pending.category.clone(),
                rate: pending.rate,
                tier: pending.tier.clone(),
                effective_from: pending.effective_from,
            };

            match self.activate_with_id(request, pending.id) {
                Ok(mut activated) => changes.changed.append(&mut activated.changed),
                Err(err) => {
                    warn!(
                        assignment_id = %pending.id,
                        category = %pending.category,
                        error = %err,
                        "pending assignment overtaken, expiring it"
                    );
                    let mut stale = pending;
                    stale.status = AssignmentStatus::Expired;
                    stale.effective_to = Some(stale.effective_from);
                    self.assignments.push(stale.clone());
                    changes.changed.push(stale);
                }
            }
        }
        changes
    }

    fn activate(&mut self, new: NewAssignment) -> AppResult<AssignmentChanges> {
        let id = Uuid::new_v4();
        self.activate_with_id(new, id)
    }

    fn activate_with_id(&mut self, new: NewAssignment, id: Uuid) -> AppResult<AssignmentChanges> {
        let current = self
            .assignments
            .iter()
            .position(|a| a.is_category(&new.category) && a.is_open_active());

        let mut changes = AssignmentChanges::default();
        let mut created = match current {
            Some(index) => {
                let (expired, created) = supersede(&self.assignments[index], new)?;
                info!(
                    category = %created.category,
                    old_rate = expired.rate,
                    new_rate = created.rate,
                    effective_from = %created.effective_from,
                    "rate assignment superseded"
                );
                self.assignments[index] = expired.clone();
                changes.changed.push(expired);
                created
            }
            None => {
                new.validate()?;
                new.into_assignment(AssignmentStatus::Active)
            }
        };
        created.id = id;

        self.assignments.push(created.clone());
        changes.changed.push(created);
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn request(category: &str, rate: f64, from: NaiveDate) -> NewAssignment {
        NewAssignment {
            category: category.to_string(),
            rate,
            tier: "Standard".to_string(),
            effective_from: from,
        }
    }

    fn open_active(category: &str, rate: f64, from: NaiveDate) -> RateAssignment {
        RateAssignment {
            id: Uuid::new_v4(),
            category: category.to_string(),
            rate,
            tier: "Standard".to_string(),
            effective_from: from,
            effective_to: None,
            status: AssignmentStatus::Active,
        }
    }

    #[test]
    fn supersede_closes_old_window() {
        let old = open_active("Standard Display", 70.0, date(2026, 1, 1));
        let (expired, active) =
            supersede(&old, request("Standard Display", 75.0, date(2026, 4, 1))).expect("ok");

        assert_eq!(expired.id, old.id);
        assert_eq!(expired.status, AssignmentStatus::Expired);
        assert_eq!(expired.effective_to, Some(date(2026, 4, 1)));
        assert_eq!(active.status, AssignmentStatus::Active);
        assert_eq!(active.effective_to, None);
        assert_eq!(active.effective_from, date(2026, 4, 1));
        assert!(active.is_open_active());
    }

    #[test]
    fn supersede_rejects_expired_or_mismatched() {
        let mut old = open_active("Standard Display", 70.0, date(2026, 1, 1));
        assert!(supersede(&old, request("Video Pre-Roll", 80.0, date(2026, 2, 1))).is_err());
        assert!(supersede(&old, request("Standard Display", 80.0, date(2025, 12, 1))).is_err());

        old.status = AssignmentStatus::Expired;
        let err = supersede(&old, request("Standard Display", 80.0, date(2026, 2, 1)))
            .expect_err("expired");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn book_keeps_single_open_active_per_category() {
        let mut book = RateBook::default();
        let today = date(2026, 5, 1);
        book.assign(request("Standard Display", 70.0, date(2026, 1, 1)), today)
            .expect("first");
        book.assign(request("Standard Display", 72.0, date(2026, 3, 1)), today)
            .expect("second");
        book.assign(request("Video Pre-Roll", 80.0, date(2026, 1, 1)), today)
            .expect("video");

        let open: Vec<_> = book
            .assignments()
            .iter()
            .filter(|a| a.is_open_active() && a.category == "Standard Display")
            .collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].rate, 72.0);
        assert_eq!(book.active_for("video pre-roll").map(|a| a.rate), Some(80.0));
    }

    #[test]
    fn rate_on_uses_historical_windows() {
        let mut book = RateBook::default();
        let today = date(2026, 5, 1);
        book.assign(request("Standard Display", 70.0, date(2026, 1, 1)), today)
            .expect("first");
        book.assign(request("Standard Display", 75.0, date(2026, 3, 1)), today)
            .expect("second");

        assert_eq!(book.rate_on("Standard Display", date(2026, 2, 1)), Some(70.0));
        assert_eq!(book.rate_on("Standard Display", date(2026, 3, 1)), Some(75.0));
        assert_eq!(book.rate_on("Standard Display", date(2025, 12, 31)), None);
    }

    #[test]
    fn future_assignment_waits_as_pending() {
        let mut book = RateBook::default();
        let today = date(2026, 5, 1);
        book.assign(request("Native Content", 70.0, date(2026, 1, 1)), today)
            .expect("active");
        let changes = book
            .assign(request("Native Content", 78.0, date(2026, 6, 1)), today)
            .expect("pending");

        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.changed[0].status, AssignmentStatus::Pending);
        assert_eq!(book.active_for("Native Content").map(|a| a.rate), Some(70.0));
        assert_eq!(book.rate_on("Native Content", date(2026, 6, 15)), Some(70.0));

        assert!(book.promote_due(date(2026, 5, 31)).is_empty());

        let promoted = book.promote_due(date(2026, 6, 1));
        assert_eq!(promoted.changed.len(), 2);
        assert_eq!(book.active_for("Native Content").map(|a| a.rate), Some(78.0));
        assert_eq!(book.rate_on("Native Content", date(2026, 5, 31)), Some(70.0));
    }

    #[test]
    fn promotion_keeps_pending_id() {
        let mut book = RateBook::default();
        let today = date(2026, 5, 1);
        let scheduled = book
            .assign(request("Native Content", 78.0, date(2026, 6, 1)), today)
            .expect("pending");
        let pending_id = scheduled.changed[0].id;

        book.promote_due(date(2026, 6, 2));
        let active = book.active_for("Native Content").expect("active");
        assert_eq!(active.id, pending_id);
    }

    #[test]
    fn overtaken_pending_assignment_expires() {
        let mut book = RateBook::default();
        book.assign(
            request("Native Content", 78.0, date(2026, 6, 1)),
            date(2026, 5, 1),
        )
        .expect("pending");
        book.assign(
            request("Native Content", 74.0, date(2026, 6, 10)),
            date(2026, 6, 10),
        )
        .expect("immediate");

        let changes = book.promote_due(date(2026, 6, 11));
        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.changed[0].status, AssignmentStatus::Expired);
        assert_eq!(book.active_for("Native Content").map(|a| a.rate), Some(74.0));
    }

    #[test]
    fn assign_validates_rate() {
        let mut book = RateBook::default();
        let err = book
            .assign(request("Standard Display", 120.0, date(2026, 1, 1)), date(2026, 1, 1))
            .expect_err("invalid");
        assert!(err.to_string().contains("rate"));
    }
}
