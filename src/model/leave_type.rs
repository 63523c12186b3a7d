use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Balance-bearing leave types; one ledger entry per identity per type.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Casual,
    Sick,
    Earned,
    CompOff,
}

/// What a request asks for. WFH and comp-off claims share the entry point
/// with ordinary leave but affect the ledger differently.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveCategory {
    Casual,
    Sick,
    Earned,
    /// Spend previously credited comp-off.
    CompOff,
    Wfh,
    /// Claim comp-off for work done on a weekend or holiday.
    CompOffClaim,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LedgerEffect {
    /// Debited at apply, credited back on reject/cancel.
    Debit(LeaveType),
    /// Credited on approval.
    Credit(LeaveType),
    None,
}

impl LeaveCategory {
    pub fn ledger_effect(self) -> LedgerEffect {
        match self {
            LeaveCategory::Casual => LedgerEffect::Debit(LeaveType::Casual),
            LeaveCategory::Sick => LedgerEffect::Debit(LeaveType::Sick),
            LeaveCategory::Earned => LedgerEffect::Debit(LeaveType::Earned),
            LeaveCategory::CompOff => LedgerEffect::Debit(LeaveType::CompOff),
            LeaveCategory::Wfh => LedgerEffect::None,
            LeaveCategory::CompOffClaim => LedgerEffect::Credit(LeaveType::CompOff),
        }
    }

    pub fn is_claim(self) -> bool {
        matches!(self, LeaveCategory::CompOffClaim)
    }
}
