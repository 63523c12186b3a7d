//! Admin-only endpoints. Mounted behind `admin_gate`.

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    leave::accrual::current_period,
    model::{
        holiday::NewHoliday,
        leave_balance::LeaveBalance,
        leave_type::LeaveType,
        period::AccrualPeriod,
        role::Role,
        settings::{AccrualRate, LopSettings, QuotaConfig},
        user::Identity,
    },
    state::AppState,
};
use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Only active identities
    pub active_only: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Deserialize, ToSchema)]
pub struct ActiveUpdate {
    pub active: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceAdjustment {
    pub leave_type: LeaveType,
    /// Positive credits, negative debits (subject to the overdraft floor).
    #[schema(example = "-1.5")]
    pub delta: Decimal,
    #[schema(example = "Correction for December")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AccrualRun {
    /// Defaults to the current month.
    #[schema(value_type = Option<String>, example = "2026-01")]
    pub period: Option<AccrualPeriod>,
}

#[derive(Serialize, ToSchema)]
pub struct UserConversion {
    pub user_id: u64,
    pub converted_days: Decimal,
}

#[derive(Deserialize, IntoParams)]
pub struct YearQuery {
    /// Calendar year
    pub year: i32,
}

async fn existing_user(state: &AppState, user_id: u64) -> AppResult<Identity> {
    state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
}

/* =========================
Identities
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Identities", body = [Identity]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<UserListQuery>,
) -> AppResult<HttpResponse> {
    let users = state
        .store
        .list_identities(query.active_only.unwrap_or(false))
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    params(("user_id" = u64, Path, description = "Identity to update")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Updated identity", body = Identity),
        (status = 400, description = "Cannot change own role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_role(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<RoleUpdate>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == auth.user_id {
        return Err(AppError::validation("admins cannot change their own role"));
    }
    if !state.store.update_role(user_id, body.role).await? {
        return Err(AppError::not_found(format!("user {user_id}")));
    }

    info!(user_id, role = %body.role, by = auth.user_id, "Role changed");
    Ok(HttpResponse::Ok().json(existing_user(&state, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/active",
    params(("user_id" = u64, Path, description = "Identity to update")),
    request_body = ActiveUpdate,
    responses(
        (status = 200, description = "Updated identity", body = Identity),
        (status = 400, description = "Cannot deactivate own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_active(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<ActiveUpdate>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == auth.user_id && !body.active {
        return Err(AppError::validation("admins cannot deactivate themselves"));
    }
    if !state.store.set_active(user_id, body.active).await? {
        return Err(AppError::not_found(format!("user {user_id}")));
    }

    info!(user_id, active = body.active, by = auth.user_id, "Account status changed");
    Ok(HttpResponse::Ok().json(existing_user(&state, user_id).await?))
}

/* =========================
Balances and LOP
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/balances",
    params(("user_id" = u64, Path, description = "Identity")),
    responses(
        (status = 200, description = "Balances per leave type", body = [LeaveBalance]),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn user_balances(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user = existing_user(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state.ledger.balances(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/balances/adjust",
    params(("user_id" = u64, Path, description = "Identity")),
    request_body = BalanceAdjustment,
    responses(
        (status = 200, description = "Adjusted balance", body = LeaveBalance),
        (status = 400, description = "Zero delta or empty reason"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Debit would cross the overdraft floor")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<BalanceAdjustment>,
) -> AppResult<HttpResponse> {
    let user = existing_user(&state, path.into_inner()).await?;
    let adjustment = body.into_inner();
    if adjustment.reason.trim().is_empty() {
        return Err(AppError::validation("an adjustment needs a reason"));
    }

    let balance = if adjustment.delta < Decimal::ZERO {
        state
            .ledger
            .debit(user.id, adjustment.leave_type, -adjustment.delta)
            .await?
    } else {
        state
            .ledger
            .credit(user.id, adjustment.leave_type, adjustment.delta)
            .await?
    };

    info!(
        user_id = user.id,
        leave_type = %adjustment.leave_type,
        delta = %adjustment.delta,
        reason = %adjustment.reason,
        by = auth.user_id,
        "Balance adjusted"
    );

    let entry = state
        .store
        .get_balance(user.id, adjustment.leave_type)
        .await?
        .unwrap_or(LeaveBalance {
            user_id: user.id,
            leave_type: adjustment.leave_type,
            balance,
            last_accrual_period: None,
        });
    Ok(HttpResponse::Ok().json(entry))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/lop",
    params(("user_id" = u64, Path, description = "Identity")),
    responses(
        (status = 200, description = "Loss-of-pay records", body = [LopRecord]),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn user_lop_records(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user = existing_user(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state.store.list_lop_records(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/lop/convert",
    params(("user_id" = u64, Path, description = "Identity")),
    responses(
        (status = 200, description = "Days converted", body = UserConversion),
        (status = 400, description = "LOP conversion disabled"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn convert_user_lop(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let converted_days = state.accrual.convert_user_negative_balances(user_id).await?;
    Ok(HttpResponse::Ok().json(UserConversion {
        user_id,
        converted_days,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/lop/convert",
    responses(
        (status = 200, description = "Aggregate conversion report", body = ConversionReport),
        (status = 400, description = "LOP conversion disabled")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn convert_all_lop(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let report = state.accrual.bulk_convert_negative_balances().await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/accrual/run",
    request_body = AccrualRun,
    responses(
        (status = 200, description = "Aggregate accrual report", body = AccrualReport)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn run_accrual(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<AccrualRun>>,
) -> AppResult<HttpResponse> {
    let period = body
        .and_then(|b| b.into_inner().period)
        .unwrap_or_else(current_period);

    info!(%period, by = auth.user_id, "Manual accrual run");
    let report = state.accrual.run_monthly_accrual(period).await?;
    Ok(HttpResponse::Ok().json(report))
}

/* =========================
Settings
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/quotas",
    responses((status = 200, description = "Quota per leave type", body = [QuotaConfig])),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_quotas(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let mut quotas = Vec::new();
    for leave_type in LeaveType::iter() {
        quotas.push(state.store.quota(leave_type).await?);
    }
    Ok(HttpResponse::Ok().json(quotas))
}

#[utoipa::path(
    put,
    path = "/api/admin/quotas",
    request_body = QuotaConfig,
    responses(
        (status = 200, description = "Stored quota", body = QuotaConfig),
        (status = 400, description = "Negative amounts")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn put_quota(
    state: web::Data<AppState>,
    body: web::Json<QuotaConfig>,
) -> AppResult<HttpResponse> {
    let quota = body.into_inner();
    if quota.annual_quota < Decimal::ZERO || quota.negative_limit < Decimal::ZERO {
        return Err(AppError::validation("quota amounts must not be negative"));
    }
    state.store.put_quota(&quota).await?;
    info!(leave_type = %quota.leave_type, "Quota updated");
    Ok(HttpResponse::Ok().json(quota))
}

#[utoipa::path(
    get,
    path = "/api/admin/accrual-rates",
    responses((status = 200, description = "Accrual rate per leave type", body = [AccrualRate])),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_accrual_rates(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let mut rates = Vec::new();
    for leave_type in LeaveType::iter() {
        rates.push(state.store.accrual_rate(leave_type).await?);
    }
    Ok(HttpResponse::Ok().json(rates))
}

#[utoipa::path(
    put,
    path = "/api/admin/accrual-rates",
    request_body = AccrualRate,
    responses(
        (status = 200, description = "Stored rate", body = AccrualRate),
        (status = 400, description = "Negative amounts")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn put_accrual_rate(
    state: web::Data<AppState>,
    body: web::Json<AccrualRate>,
) -> AppResult<HttpResponse> {
    let rate = body.into_inner();
    if rate.monthly_amount < Decimal::ZERO || rate.max_balance.is_some_and(|m| m < Decimal::ZERO)
    {
        return Err(AppError::validation("accrual amounts must not be negative"));
    }
    state.store.put_accrual_rate(&rate).await?;
    info!(leave_type = %rate.leave_type, "Accrual rate updated");
    Ok(HttpResponse::Ok().json(rate))
}

#[utoipa::path(
    get,
    path = "/api/admin/lop-settings",
    responses((status = 200, description = "LOP settings", body = LopSettings)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_lop_settings(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.store.lop_settings().await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/lop-settings",
    request_body = LopSettings,
    responses(
        (status = 200, description = "Stored settings", body = LopSettings),
        (status = 400, description = "Negative deduction")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn put_lop_settings(
    state: web::Data<AppState>,
    body: web::Json<LopSettings>,
) -> AppResult<HttpResponse> {
    let settings = body.into_inner();
    if settings.deduction_per_day < Decimal::ZERO {
        return Err(AppError::validation("deduction_per_day must not be negative"));
    }
    state.store.put_lop_settings(&settings).await?;
    info!("LOP settings updated");
    Ok(HttpResponse::Ok().json(settings))
}

/* =========================
Holidays
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/holidays",
    params(YearQuery),
    responses((status = 200, description = "Every holiday of the year, all scopes", body = [Holiday])),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_holidays(
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let holidays = state.calendar.year(query.year).await?;
    Ok(HttpResponse::Ok().json(holidays.as_slice()))
}

#[utoipa::path(
    post,
    path = "/api/admin/holidays",
    request_body = NewHoliday,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 400, description = "Empty label")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_holiday(
    state: web::Data<AppState>,
    body: web::Json<NewHoliday>,
) -> AppResult<HttpResponse> {
    let holiday = state.calendar.add(body.into_inner()).await?;
    info!(holiday_id = holiday.id, date = %holiday.date, "Holiday added");
    Ok(HttpResponse::Created().json(holiday))
}

#[utoipa::path(
    delete,
    path = "/api/admin/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday to delete")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_holiday(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state.calendar.remove(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
