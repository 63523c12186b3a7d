//! In-process store used when no `DATABASE_URL` is configured, and by tests.
//!
//! A single mutex guards all state, so every trait method is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{BalanceStore, HolidayStore, IdentityStore, RequestStore, SessionStore, SettingsStore};
use crate::{
    error::{AppError, AppResult},
    model::{
        holiday::{Holiday, NewHoliday},
        leave_balance::{AccrualOutcome, BalanceChange, LeaveBalance, LopRecord},
        leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest, RequestFilter, Transition},
        leave_type::LeaveType,
        period::AccrualPeriod,
        role::Role,
        settings::{AccrualRate, LopSettings, QuotaConfig},
        user::{Identity, NewIdentity},
    },
};

struct RefreshToken {
    user_id: u64,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    identities: HashMap<u64, Identity>,
    refresh_tokens: HashMap<String, RefreshToken>,
    balances: HashMap<(u64, LeaveType), LeaveBalance>,
    lop_records: Vec<LopRecord>,
    requests: HashMap<u64, LeaveRequest>,
    holidays: HashMap<u64, Holiday>,
    quotas: HashMap<LeaveType, QuotaConfig>,
    accrual_rates: HashMap<LeaveType, AccrualRate>,
    lop_settings: Option<LopSettings>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn balance_entry(&mut self, user_id: u64, leave_type: LeaveType) -> &mut LeaveBalance {
        self.balances
            .entry((user_id, leave_type))
            .or_insert_with(|| LeaveBalance {
                user_id,
                leave_type,
                balance: Decimal::ZERO,
                last_accrual_period: None,
            })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_id(&self, id: u64) -> AppResult<Option<Identity>> {
        Ok(self.state.lock().await.identities.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Identity>> {
        let username = username.to_lowercase();
        let state = self.state.lock().await;
        Ok(state
            .identities
            .values()
            .find(|i| i.username.to_lowercase() == username)
            .cloned())
    }

    async fn insert_identity(&self, new: NewIdentity) -> AppResult<Identity> {
        let mut state = self.state.lock().await;
        let lowered = new.username.to_lowercase();
        if state
            .identities
            .values()
            .any(|i| i.username.to_lowercase() == lowered)
        {
            return Err(AppError::Conflict("Username already taken".into()));
        }

        let identity = Identity {
            id: state.next_id(),
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            department_id: new.department_id,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        state.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn update_role(&self, id: u64, role: Role) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.identities.get_mut(&id) {
            Some(identity) => {
                identity.role = role;
                true
            }
            None => false,
        })
    }

    async fn set_active(&self, id: u64, active: bool) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.identities.get_mut(&id) {
            Some(identity) => {
                identity.is_active = active;
                true
            }
            None => false,
        })
    }

    async fn list_identities(&self, active_only: bool) -> AppResult<Vec<Identity>> {
        let state = self.state.lock().await;
        let mut all: Vec<Identity> = state
            .identities
            .values()
            .filter(|i| !active_only || i.is_active)
            .cloned()
            .collect();
        all.sort_by_key(|i| i.id);
        Ok(all)
    }

    async fn record_login(&self, id: u64) -> AppResult<()> {
        if let Some(identity) = self.state.lock().await.identities.get_mut(&id) {
            identity.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.state.lock().await.refresh_tokens.insert(
            jti.to_string(),
            RefreshToken {
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>> {
        let mut state = self.state.lock().await;
        Ok(match state.refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked && token.expires_at > Utc::now() => {
                token.revoked = true;
                Some(token.user_id)
            }
            _ => None,
        })
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()> {
        if let Some(token) = self.state.lock().await.refresh_tokens.get_mut(jti) {
            token.revoked = true;
        }
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn get_balance(
        &self,
        user_id: u64,
        leave_type: LeaveType,
    ) -> AppResult<Option<LeaveBalance>> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .get(&(user_id, leave_type))
            .cloned())
    }

    async fn list_balances(&self, user_id: u64) -> AppResult<Vec<LeaveBalance>> {
        let state = self.state.lock().await;
        let mut out: Vec<LeaveBalance> = state
            .balances
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.leave_type.as_ref().to_string());
        Ok(out)
    }

    async fn init_balance(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        amount: Decimal,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .balances
            .entry((user_id, leave_type))
            .or_insert(LeaveBalance {
                user_id,
                leave_type,
                balance: amount,
                last_accrual_period: None,
            });
        Ok(())
    }

    async fn apply_delta(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        delta: Decimal,
        floor: Option<Decimal>,
    ) -> AppResult<BalanceChange> {
        let mut state = self.state.lock().await;
        let entry = state.balance_entry(user_id, leave_type);
        let next = entry.balance + delta;
        if floor.is_some_and(|f| next < f) {
            return Ok(BalanceChange::Rejected {
                balance: entry.balance,
            });
        }
        entry.balance = next;
        Ok(BalanceChange::Applied { balance: next })
    }

    async fn accrue(
        &self,
        user_id: u64,
        rate: &AccrualRate,
        period: AccrualPeriod,
    ) -> AppResult<AccrualOutcome> {
        let mut state = self.state.lock().await;
        let entry = state.balance_entry(user_id, rate.leave_type);
        if entry.last_accrual_period.is_some_and(|last| last >= period) {
            return Ok(AccrualOutcome::AlreadyApplied);
        }
        let amount = rate.credit_for(entry.balance);
        entry.balance += amount;
        entry.last_accrual_period = Some(period);
        Ok(AccrualOutcome::Credited {
            amount,
            balance: entry.balance,
        })
    }

    async fn convert_negative(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        deduction_per_day: Decimal,
    ) -> AppResult<Decimal> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.balances.get_mut(&(user_id, leave_type)) else {
            return Ok(Decimal::ZERO);
        };
        if entry.balance >= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let days = -entry.balance;
        entry.balance = Decimal::ZERO;
        let id = state.next_id();
        state.lop_records.push(LopRecord {
            id,
            user_id,
            leave_type,
            days,
            deduction: days * deduction_per_day,
            recorded_at: Utc::now(),
        });
        Ok(days)
    }

    async fn list_lop_records(&self, user_id: u64) -> AppResult<Vec<LopRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .lop_records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        let mut state = self.state.lock().await;
        let request = LeaveRequest {
            id: state.next_id(),
            user_id: new.user_id,
            category: new.category,
            start_date: new.start_date,
            end_date: new.end_date,
            half_day: new.half_day,
            days: new.days,
            reason: new.reason,
            documents: new.documents,
            status: LeaveStatus::Pending,
            decided_by: None,
            decided_at: None,
            decision_comment: None,
            created_at: Utc::now(),
        };
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        Ok(self.state.lock().await.requests.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<LeaveRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| r.user_id == user_id && r.status.is_active() && r.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn transition(&self, id: u64, transition: &Transition) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(request) = state.requests.get_mut(&id) else {
            return Ok(false);
        };
        if request.status != transition.from {
            return Ok(false);
        }
        request.status = transition.to;
        request.decided_by = Some(transition.actor);
        request.decided_at = Some(transition.at);
        request.decision_comment = transition.comment.clone();
        let owner = request.user_id;
        if let Some((leave_type, amount)) = transition.credit {
            state.balance_entry(owner, leave_type).balance += amount;
        }
        Ok(true)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<(Vec<LeaveRequest>, u64)> {
        let state = self.state.lock().await;
        let mut matched: Vec<LeaveRequest> = state
            .requests
            .values()
            .filter(|r| filter.user_id.is_none_or(|id| r.user_id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.category.is_none_or(|c| r.category == c))
            .filter(|r| {
                filter.department_id.is_none_or(|dept| {
                    state
                        .identities
                        .get(&r.user_id)
                        .is_some_and(|i| i.department_id == Some(dept))
                })
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl HolidayStore for MemoryStore {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Holiday>> {
        let state = self.state.lock().await;
        let mut out: Vec<Holiday> = state
            .holidays
            .values()
            .filter(|h| h.date >= from && h.date <= to)
            .cloned()
            .collect();
        out.sort_by_key(|h| h.date);
        Ok(out)
    }

    async fn insert_holiday(&self, new: NewHoliday) -> AppResult<Holiday> {
        let mut state = self.state.lock().await;
        let holiday = Holiday {
            id: state.next_id(),
            date: new.date,
            label: new.label,
            department_id: new.department_id,
        };
        state.holidays.insert(holiday.id, holiday.clone());
        Ok(holiday)
    }

    async fn delete_holiday(&self, id: u64) -> AppResult<bool> {
        Ok(self.state.lock().await.holidays.remove(&id).is_some())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn quota(&self, leave_type: LeaveType) -> AppResult<QuotaConfig> {
        Ok(self
            .state
            .lock()
            .await
            .quotas
            .get(&leave_type)
            .cloned()
            .unwrap_or_else(|| QuotaConfig::default_for(leave_type)))
    }

    async fn put_quota(&self, quota: &QuotaConfig) -> AppResult<()> {
        self.state
            .lock()
            .await
            .quotas
            .insert(quota.leave_type, quota.clone());
        Ok(())
    }

    async fn accrual_rate(&self, leave_type: LeaveType) -> AppResult<AccrualRate> {
        Ok(self
            .state
            .lock()
            .await
            .accrual_rates
            .get(&leave_type)
            .cloned()
            .unwrap_or_else(|| AccrualRate::default_for(leave_type)))
    }

    async fn put_accrual_rate(&self, rate: &AccrualRate) -> AppResult<()> {
        self.state
            .lock()
            .await
            .accrual_rates
            .insert(rate.leave_type, rate.clone());
        Ok(())
    }

    async fn lop_settings(&self) -> AppResult<LopSettings> {
        Ok(self
            .state
            .lock()
            .await
            .lop_settings
            .clone()
            .unwrap_or_default())
    }

    async fn put_lop_settings(&self, settings: &LopSettings) -> AppResult<()> {
        self.state.lock().await.lop_settings = Some(settings.clone());
        Ok(())
    }
}
