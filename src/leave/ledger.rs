//! Per-identity, per-type leave balances.
//!
//! Every mutation is one atomic store call, so concurrent debits against the
//! same entry cannot both pass the floor check.

use std::sync::Arc;

use rust_decimal::Decimal;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    model::{
        leave_balance::{BalanceChange, LeaveBalance},
        leave_type::LeaveType,
    },
    store::Store,
};

pub struct Ledger {
    store: Arc<dyn Store>,
}

fn ensure_positive(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current balance; an identity without an entry holds zero.
    pub async fn read(&self, user_id: u64, leave_type: LeaveType) -> AppResult<Decimal> {
        Ok(self
            .store
            .get_balance(user_id, leave_type)
            .await?
            .map(|b| b.balance)
            .unwrap_or(Decimal::ZERO))
    }

    /// One entry per leave type, zero-filled where nothing was ever recorded.
    pub async fn balances(&self, user_id: u64) -> AppResult<Vec<LeaveBalance>> {
        let stored = self.store.list_balances(user_id).await?;
        Ok(LeaveType::iter()
            .map(|leave_type| {
                stored
                    .iter()
                    .find(|b| b.leave_type == leave_type)
                    .cloned()
                    .unwrap_or(LeaveBalance {
                        user_id,
                        leave_type,
                        balance: Decimal::ZERO,
                        last_accrual_period: None,
                    })
            })
            .collect())
    }

    pub async fn debit(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        amount: Decimal,
    ) -> AppResult<Decimal> {
        ensure_positive(amount)?;
        let floor = self.store.quota(leave_type).await?.floor();

        match self
            .store
            .apply_delta(user_id, leave_type, -amount, Some(floor))
            .await?
        {
            BalanceChange::Applied { balance } => {
                debug!(user_id, %leave_type, %amount, %balance, "Ledger debit");
                Ok(balance)
            }
            BalanceChange::Rejected { balance } => Err(AppError::InsufficientBalance {
                leave_type,
                available: balance - floor,
                requested: amount,
            }),
        }
    }

    pub async fn credit(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        amount: Decimal,
    ) -> AppResult<Decimal> {
        ensure_positive(amount)?;

        match self
            .store
            .apply_delta(user_id, leave_type, amount, None)
            .await?
        {
            BalanceChange::Applied { balance } => {
                debug!(user_id, %leave_type, %amount, %balance, "Ledger credit");
                Ok(balance)
            }
            BalanceChange::Rejected { .. } => Err(AppError::internal(
                "unconditional credit reported as rejected",
            )),
        }
    }

    /// Seeds each type with its configured annual quota. Existing entries
    /// are left alone.
    pub async fn grant_quota(&self, user_id: u64) -> AppResult<()> {
        for leave_type in LeaveType::iter() {
            let quota = self.store.quota(leave_type).await?;
            self.store
                .init_balance(user_id, leave_type, quota.annual_quota)
                .await?;
        }
        Ok(())
    }

    /// Zeroes every negative balance of the identity, writing one LOP record
    /// per converted type. Returns the total days converted.
    pub async fn convert_negative_to_lop(&self, user_id: u64) -> AppResult<Decimal> {
        let settings = self.store.lop_settings().await?;
        let mut total = Decimal::ZERO;

        for leave_type in LeaveType::iter() {
            let days = self
                .store
                .convert_negative(user_id, leave_type, settings.deduction_per_day)
                .await?;
            if days > Decimal::ZERO {
                info!(user_id, %leave_type, %days, "Converted negative balance to LOP");
                total += days;
            }
        }

        Ok(total)
    }
}
