use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_type::{LeaveCategory, LeaveType};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }

    /// Pending or approved requests block overlapping applications.
    pub fn is_active(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 1000,
    "category": "casual",
    "start_date": "2026-01-05",
    "end_date": "2026-01-07",
    "half_day": false,
    "days": "3",
    "reason": "Family trip",
    "documents": [],
    "status": "pending",
    "decided_by": null,
    "decided_at": null,
    "decision_comment": null,
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub category: LeaveCategory,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day: bool,
    /// Ledger units computed at apply time (weekends and holidays excluded).
    pub days: Decimal,
    pub reason: Option<String>,
    /// Opaque document-store references.
    pub documents: Vec<String>,
    pub status: LeaveStatus,
    pub decided_by: Option<u64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Insert payload; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub category: LeaveCategory,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day: bool,
    pub days: Decimal,
    pub reason: Option<String>,
    pub documents: Vec<String>,
}

/// A status change applied only if the request is still in `from`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: LeaveStatus,
    pub to: LeaveStatus,
    pub actor: u64,
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
    /// Credited to the request owner together with the status change.
    pub credit: Option<(LeaveType, Decimal)>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub user_id: Option<u64>,
    /// Restrict to identities in this department.
    pub department_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub category: Option<LeaveCategory>,
    pub page: u64,
    pub per_page: u64,
}

impl RequestFilter {
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn overlap_is_inclusive() {
        let req = LeaveRequest {
            id: 1,
            user_id: 1,
            category: LeaveCategory::Casual,
            start_date: date("2026-03-02"),
            end_date: date("2026-03-04"),
            half_day: false,
            days: Decimal::new(3, 0),
            reason: None,
            documents: vec![],
            status: LeaveStatus::Pending,
            decided_by: None,
            decided_at: None,
            decision_comment: None,
            created_at: Utc::now(),
        };
        assert!(req.overlaps(date("2026-03-04"), date("2026-03-06")));
        assert!(req.overlaps(date("2026-02-27"), date("2026-03-02")));
        assert!(!req.overlaps(date("2026-03-05"), date("2026-03-06")));
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
        assert!(!LeaveStatus::Cancelled.is_active());
    }
}
