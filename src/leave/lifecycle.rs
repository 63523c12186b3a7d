//! Apply, decide and cancel leave, WFH and comp-off requests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    leave::{
        calendar::{HolidayCalendar, MAX_SPAN_DAYS, dates_between, is_weekend},
        ledger::Ledger,
    },
    model::{
        leave_request::{
            Decision, LeaveRequest, LeaveStatus, NewLeaveRequest, RequestFilter, Transition,
        },
        leave_type::{LeaveCategory, LeaveType, LedgerEffect},
        role::Role,
    },
    store::Store,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "category": "casual",
    "start_date": "2026-03-02",
    "end_date": "2026-03-04",
    "half_day": false,
    "reason": "Family function",
    "documents": []
}))]
pub struct ApplyLeave {
    pub category: LeaveCategory,
    #[schema(value_type = String)]
    pub start_date: NaiveDate,
    #[schema(value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub half_day: bool,
    pub reason: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
}

impl ApplyLeave {
    fn validate(&self) -> AppResult<()> {
        if self.start_date > self.end_date {
            return Err(AppError::validation("start_date must not be after end_date"));
        }
        if (self.end_date - self.start_date).num_days() >= MAX_SPAN_DAYS {
            return Err(AppError::validation(format!(
                "a request may span at most {MAX_SPAN_DAYS} days"
            )));
        }
        if self.half_day && self.start_date != self.end_date {
            return Err(AppError::validation("half-day requests must cover a single date"));
        }
        Ok(())
    }
}

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// Pagination and filters shared by the listing endpoints.
#[derive(Debug, Clone, Default)]
pub struct ListScope {
    pub status: Option<LeaveStatus>,
    pub category: Option<LeaveCategory>,
    pub page: u64,
    pub per_page: u64,
}

impl ListScope {
    fn filter(&self) -> RequestFilter {
        RequestFilter {
            status: self.status,
            category: self.category,
            page: self.page.max(1),
            per_page: match self.per_page {
                0 => DEFAULT_PER_PAGE,
                n => n.min(MAX_PER_PAGE),
            },
            ..RequestFilter::default()
        }
    }
}

pub struct LeaveService {
    store: Arc<dyn Store>,
    ledger: Arc<Ledger>,
    calendar: Arc<HolidayCalendar>,
    apply_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl LeaveService {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<Ledger>, calendar: Arc<HolidayCalendar>) -> Self {
        Self {
            store,
            ledger,
            calendar,
            apply_locks: DashMap::new(),
        }
    }

    fn apply_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        self.apply_locks.entry(user_id).or_default().clone()
    }

    /// Ledger units for a leave or WFH range: working days only.
    async fn leave_days(&self, actor: &AuthUser, input: &ApplyLeave) -> AppResult<Decimal> {
        let working = self
            .calendar
            .working_days(input.start_date, input.end_date, actor.department_id)
            .await?;
        if working.is_empty() {
            return Err(AppError::validation(
                "requested range contains no working days",
            ));
        }
        Ok(if input.half_day {
            dec!(0.5)
        } else {
            Decimal::from(working.len())
        })
    }

    /// Ledger units for a comp-off claim: every date must be a past or
    /// present non-working day.
    async fn claim_days(&self, actor: &AuthUser, input: &ApplyLeave) -> AppResult<Decimal> {
        let today = Utc::now().date_naive();
        if input.end_date > today {
            return Err(AppError::validation("comp-off cannot be claimed for future dates"));
        }

        let holidays = self
            .calendar
            .holiday_dates(input.start_date, input.end_date, actor.department_id)
            .await?;
        let dates = dates_between(input.start_date, input.end_date);
        if let Some(working) = dates
            .iter()
            .find(|d| !is_weekend(**d) && !holidays.contains(*d))
        {
            return Err(AppError::validation(format!(
                "comp-off can only be claimed for weekends or holidays, {working} is a working day"
            )));
        }

        Ok(if input.half_day {
            dec!(0.5)
        } else {
            Decimal::from(dates.len())
        })
    }

    async fn ensure_no_overlap(&self, user_id: u64, input: &ApplyLeave) -> AppResult<()> {
        let existing = self
            .store
            .find_overlapping(user_id, input.start_date, input.end_date)
            .await?;

        // Claims and absences live on separate axes.
        let claim = input.category.is_claim();
        match existing.iter().find(|r| r.category.is_claim() == claim) {
            Some(clash) => Err(AppError::OverlappingRequest {
                existing_id: clash.id,
            }),
            None => Ok(()),
        }
    }

    pub async fn apply(&self, actor: &AuthUser, input: ApplyLeave) -> AppResult<LeaveRequest> {
        input.validate()?;

        let lock = self.apply_lock(actor.user_id);
        let _guard = lock.lock().await;

        let days = if input.category.is_claim() {
            self.claim_days(actor, &input).await?
        } else {
            self.leave_days(actor, &input).await?
        };
        self.ensure_no_overlap(actor.user_id, &input).await?;

        let debited = match input.category.ledger_effect() {
            LedgerEffect::Debit(leave_type) => {
                self.ledger.debit(actor.user_id, leave_type, days).await?;
                Some(leave_type)
            }
            LedgerEffect::Credit(_) | LedgerEffect::None => None,
        };

        let created = self
            .store
            .insert_request(NewLeaveRequest {
                user_id: actor.user_id,
                category: input.category,
                start_date: input.start_date,
                end_date: input.end_date,
                half_day: input.half_day,
                days,
                reason: input.reason,
                documents: input.documents,
            })
            .await;

        match created {
            Ok(request) => {
                info!(
                    request_id = request.id,
                    user_id = actor.user_id,
                    category = %request.category,
                    %days,
                    "Leave request created"
                );
                Ok(request)
            }
            Err(e) => {
                if let Some(leave_type) = debited {
                    if let Err(undo) = self.ledger.credit(actor.user_id, leave_type, days).await {
                        warn!(error = %undo, user_id = actor.user_id, "Failed to restore debit");
                    }
                }
                Err(e)
            }
        }
    }

    async fn load(&self, id: u64) -> AppResult<LeaveRequest> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("leave request {id}")))
    }

    /// Managers decide within their own department; nobody decides their own request.
    async fn ensure_may_decide(&self, actor: &AuthUser, request: &LeaveRequest) -> AppResult<()> {
        if request.user_id == actor.user_id {
            return Err(AppError::forbidden(&[]));
        }
        if actor.role == Role::Manager {
            if let Some(dept) = actor.department_id {
                let owner = self.store.find_by_id(request.user_id).await?;
                if owner.and_then(|o| o.department_id) != Some(dept) {
                    return Err(AppError::forbidden(Role::ADMIN_ONLY));
                }
            }
        }
        Ok(())
    }

    /// Conditional status change plus its ledger credit, as one store
    /// operation; loses cleanly to a concurrent decision.
    async fn transition(
        &self,
        request: &LeaveRequest,
        to: LeaveStatus,
        actor: u64,
        comment: Option<String>,
        credit: Option<(LeaveType, Decimal)>,
    ) -> AppResult<LeaveRequest> {
        if request.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: request.status,
                to,
            });
        }

        let transition = Transition {
            from: LeaveStatus::Pending,
            to,
            actor,
            comment,
            at: Utc::now(),
            credit,
        };
        if !self.store.transition(request.id, &transition).await? {
            let current = self.load(request.id).await?;
            return Err(AppError::InvalidTransition {
                from: current.status,
                to,
            });
        }
        self.load(request.id).await
    }

    pub async fn decide(
        &self,
        actor: &AuthUser,
        id: u64,
        decision: Decision,
        comment: Option<String>,
    ) -> AppResult<LeaveRequest> {
        actor.require_approver()?;
        let request = self.load(id).await?;
        self.ensure_may_decide(actor, &request).await?;

        // Approved claims earn comp-off; rejected leave gets its debit back.
        let credit = match (decision, request.category.ledger_effect()) {
            (Decision::Approve, LedgerEffect::Credit(leave_type))
            | (Decision::Reject, LedgerEffect::Debit(leave_type)) => {
                Some((leave_type, request.days))
            }
            _ => None,
        };

        let target = decision.target();
        let updated = self
            .transition(&request, target, actor.user_id, comment, credit)
            .await?;

        info!(
            request_id = id,
            decided_by = actor.user_id,
            status = %target,
            "Leave request decided"
        );
        Ok(updated)
    }

    pub async fn cancel(&self, actor: &AuthUser, id: u64) -> AppResult<LeaveRequest> {
        let request = self.load(id).await?;
        if request.user_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::not_found(format!("leave request {id}")));
        }

        let credit = match request.category.ledger_effect() {
            LedgerEffect::Debit(leave_type) => Some((leave_type, request.days)),
            LedgerEffect::Credit(_) | LedgerEffect::None => None,
        };
        let updated = self
            .transition(&request, LeaveStatus::Cancelled, actor.user_id, None, credit)
            .await?;

        info!(request_id = id, cancelled_by = actor.user_id, "Leave request cancelled");
        Ok(updated)
    }

    /// Owners see their own requests; approvers see what they could decide.
    pub async fn get(&self, actor: &AuthUser, id: u64) -> AppResult<LeaveRequest> {
        let request = self.load(id).await?;
        if request.user_id == actor.user_id || actor.is_admin() {
            return Ok(request);
        }
        if actor.role == Role::Manager {
            let owner = self.store.find_by_id(request.user_id).await?;
            let in_scope = match actor.department_id {
                Some(dept) => owner.and_then(|o| o.department_id) == Some(dept),
                None => true,
            };
            if in_scope {
                return Ok(request);
            }
        }
        Err(AppError::not_found(format!("leave request {id}")))
    }

    pub async fn list_for_identity(
        &self,
        user_id: u64,
        scope: &ListScope,
    ) -> AppResult<(Vec<LeaveRequest>, u64)> {
        let filter = RequestFilter {
            user_id: Some(user_id),
            ..scope.filter()
        };
        self.store.list_requests(&filter).await
    }

    fn department_scope(actor: &AuthUser) -> Option<u64> {
        match actor.role {
            Role::Admin => None,
            _ => actor.department_id,
        }
    }

    pub async fn list_pending(
        &self,
        actor: &AuthUser,
        scope: &ListScope,
    ) -> AppResult<(Vec<LeaveRequest>, u64)> {
        actor.require_approver()?;
        let filter = RequestFilter {
            status: Some(LeaveStatus::Pending),
            department_id: Self::department_scope(actor),
            ..scope.filter()
        };
        self.store.list_requests(&filter).await
    }

    pub async fn list_all(
        &self,
        actor: &AuthUser,
        scope: &ListScope,
    ) -> AppResult<(Vec<LeaveRequest>, u64)> {
        actor.require_approver()?;
        let filter = RequestFilter {
            department_id: Self::department_scope(actor),
            ..scope.filter()
        };
        self.store.list_requests(&filter).await
    }
}
