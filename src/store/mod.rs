//! Persistence seams. Services hold an `Arc<dyn Store>` handed in at startup.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    model::{
        holiday::{Holiday, NewHoliday},
        leave_balance::{AccrualOutcome, BalanceChange, LeaveBalance, LopRecord},
        leave_request::{LeaveRequest, NewLeaveRequest, RequestFilter, Transition},
        leave_type::LeaveType,
        period::AccrualPeriod,
        role::Role,
        settings::{AccrualRate, LopSettings, QuotaConfig},
        user::{Identity, NewIdentity},
    },
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> AppResult<Option<Identity>>;
    /// Credential lookup key is the (case-insensitive) username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Identity>>;
    /// Fails with `Conflict` when the username is taken.
    async fn insert_identity(&self, new: NewIdentity) -> AppResult<Identity>;
    async fn update_role(&self, id: u64, role: Role) -> AppResult<bool>;
    async fn set_active(&self, id: u64, active: bool) -> AppResult<bool>;
    async fn list_identities(&self, active_only: bool) -> AppResult<Vec<Identity>>;
    async fn record_login(&self, id: u64) -> AppResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Revokes the token and returns its owner, if it was still live.
    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>>;
    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn get_balance(&self, user_id: u64, leave_type: LeaveType)
    -> AppResult<Option<LeaveBalance>>;
    async fn list_balances(&self, user_id: u64) -> AppResult<Vec<LeaveBalance>>;
    /// Creates the entry with `amount` unless it already exists.
    async fn init_balance(&self, user_id: u64, leave_type: LeaveType, amount: Decimal)
    -> AppResult<()>;
    /// Adds `delta` in one step. With a floor, the update is skipped when the
    /// result would fall below it. A missing entry counts as zero.
    async fn apply_delta(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        delta: Decimal,
        floor: Option<Decimal>,
    ) -> AppResult<BalanceChange>;
    /// Credits at most once per (identity, type, period).
    async fn accrue(
        &self,
        user_id: u64,
        rate: &AccrualRate,
        period: AccrualPeriod,
    ) -> AppResult<AccrualOutcome>;
    /// Zeroes a negative balance and writes the matching LOP record.
    /// Returns the days converted (zero when the balance was not negative).
    async fn convert_negative(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        deduction_per_day: Decimal,
    ) -> AppResult<Decimal>;
    async fn list_lop_records(&self, user_id: u64) -> AppResult<Vec<LopRecord>>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest>;
    async fn get_request(&self, id: u64) -> AppResult<Option<LeaveRequest>>;
    /// Pending or approved requests of `user_id` intersecting the range.
    async fn find_overlapping(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<LeaveRequest>>;
    /// Applies the transition only if the stored status still equals
    /// `transition.from`, together with its ledger credit. Either both land
    /// or neither does. Returns whether it was applied.
    async fn transition(&self, id: u64, transition: &Transition) -> AppResult<bool>;
    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<(Vec<LeaveRequest>, u64)>;
}

#[async_trait]
pub trait HolidayStore: Send + Sync {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Holiday>>;
    async fn insert_holiday(&self, new: NewHoliday) -> AppResult<Holiday>;
    async fn delete_holiday(&self, id: u64) -> AppResult<bool>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Falls back to `QuotaConfig::default_for` when unset.
    async fn quota(&self, leave_type: LeaveType) -> AppResult<QuotaConfig>;
    async fn put_quota(&self, quota: &QuotaConfig) -> AppResult<()>;
    async fn accrual_rate(&self, leave_type: LeaveType) -> AppResult<AccrualRate>;
    async fn put_accrual_rate(&self, rate: &AccrualRate) -> AppResult<()>;
    async fn lop_settings(&self) -> AppResult<LopSettings>;
    async fn put_lop_settings(&self, settings: &LopSettings) -> AppResult<()>;
}

/// Everything the services need, behind one handle.
pub trait Store:
    IdentityStore + SessionStore + BalanceStore + RequestStore + HolidayStore + SettingsStore
{
}

impl<T> Store for T where
    T: IdentityStore + SessionStore + BalanceStore + RequestStore + HolidayStore + SettingsStore
{
}
