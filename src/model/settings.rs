use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_type::LeaveType;

/// Yearly grant and overdraft policy for one leave type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuotaConfig {
    pub leave_type: LeaveType,
    #[schema(example = "12")]
    pub annual_quota: Decimal,
    pub allow_negative: bool,
    /// Largest overdraft in days when `allow_negative` is set.
    #[schema(example = "5")]
    pub negative_limit: Decimal,
}

impl QuotaConfig {
    pub fn default_for(leave_type: LeaveType) -> Self {
        let (annual_quota, allow_negative, negative_limit) = match leave_type {
            LeaveType::Casual => (dec!(12), true, dec!(5)),
            LeaveType::Sick => (dec!(10), true, dec!(3)),
            LeaveType::Earned => (dec!(0), false, dec!(0)),
            LeaveType::CompOff => (dec!(0), false, dec!(0)),
        };
        Self {
            leave_type,
            annual_quota,
            allow_negative,
            negative_limit,
        }
    }

    /// Lowest balance a debit may leave behind.
    pub fn floor(&self) -> Decimal {
        if self.allow_negative && self.leave_type != LeaveType::CompOff {
            -self.negative_limit
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccrualRate {
    pub leave_type: LeaveType,
    #[schema(example = "1.5")]
    pub monthly_amount: Decimal,
    /// Accrual stops once the balance reaches this cap.
    pub max_balance: Option<Decimal>,
}

impl AccrualRate {
    pub fn default_for(leave_type: LeaveType) -> Self {
        let (monthly_amount, max_balance) = match leave_type {
            LeaveType::Earned => (dec!(1.5), Some(dec!(45))),
            _ => (dec!(0), None),
        };
        Self {
            leave_type,
            monthly_amount,
            max_balance,
        }
    }

    /// Amount to credit given the current balance, respecting the cap.
    pub fn credit_for(&self, current: Decimal) -> Decimal {
        match self.max_balance {
            Some(cap) if current >= cap => Decimal::ZERO,
            Some(cap) => self.monthly_amount.min(cap - current),
            None => self.monthly_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LopSettings {
    pub conversion_enabled: bool,
    /// Payroll deduction recorded per converted day.
    #[schema(example = "100")]
    pub deduction_per_day: Decimal,
    pub auto_convert_after_accrual: bool,
}

impl Default for LopSettings {
    fn default() -> Self {
        Self {
            conversion_enabled: true,
            deduction_per_day: Decimal::ZERO,
            auto_convert_after_accrual: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_follows_negative_policy() {
        assert_eq!(QuotaConfig::default_for(LeaveType::Casual).floor(), dec!(-5));
        assert_eq!(QuotaConfig::default_for(LeaveType::Earned).floor(), dec!(0));

        let comp_off = QuotaConfig {
            leave_type: LeaveType::CompOff,
            annual_quota: dec!(0),
            allow_negative: true,
            negative_limit: dec!(2),
        };
        assert_eq!(comp_off.floor(), dec!(0));
    }

    #[test]
    fn accrual_respects_cap() {
        let rate = AccrualRate {
            leave_type: LeaveType::Earned,
            monthly_amount: dec!(1.5),
            max_balance: Some(dec!(10)),
        };
        assert_eq!(rate.credit_for(dec!(2)), dec!(1.5));
        assert_eq!(rate.credit_for(dec!(9)), dec!(1));
        assert_eq!(rate.credit_for(dec!(10)), dec!(0));
        assert_eq!(rate.credit_for(dec!(-3)), dec!(1.5));
    }
}
