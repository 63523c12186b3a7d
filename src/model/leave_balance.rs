use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{leave_type::LeaveType, period::AccrualPeriod};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    pub user_id: u64,
    pub leave_type: LeaveType,
    /// Negative means loss-of-pay debt not yet converted.
    #[schema(example = "12.5")]
    pub balance: Decimal,
    #[schema(value_type = Option<String>, example = "2026-01")]
    pub last_accrual_period: Option<AccrualPeriod>,
}

/// Result of a conditional balance update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Applied { balance: Decimal },
    /// The update would have crossed the floor; nothing changed.
    Rejected { balance: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualOutcome {
    Credited { amount: Decimal, balance: Decimal },
    AlreadyApplied,
}

/// Loss-of-pay entry written when a negative balance is zeroed out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LopRecord {
    pub id: u64,
    pub user_id: u64,
    pub leave_type: LeaveType,
    pub days: Decimal,
    pub deduction: Decimal,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}
