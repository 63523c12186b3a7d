use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    leave::lifecycle::{ApplyLeave, DEFAULT_PER_PAGE, ListScope, MAX_PER_PAGE},
    model::{
        leave_request::{Decision, LeaveRequest, LeaveStatus},
        leave_type::{LeaveCategory, LeaveType},
    },
    state::AppState,
};
use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "user_id": 1000,
            "category": "sick",
            "start_date": "2026-01-05",
            "end_date": "2026-01-06",
            "half_day": false,
            "days": "2",
            "reason": null,
            "documents": [],
            "status": "pending",
            "decided_by": null,
            "decided_at": null,
            "decision_comment": null,
            "created_at": "2026-01-01T00:00:00Z"
        }
    ],
    "page": 1,
    "per_page": 20,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by request status
    pub status: Option<LeaveStatus>,
    /// Filter by category
    pub category: Option<LeaveCategory>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 20)]
    /// Items per page
    pub per_page: Option<u64>,
}

impl LeaveFilter {
    fn scope(&self) -> ListScope {
        ListScope {
            status: self.status,
            category: self.category,
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE).min(MAX_PER_PAGE),
        }
    }

    fn respond(&self, (data, total): (Vec<LeaveRequest>, u64)) -> HttpResponse {
        let scope = self.scope();
        HttpResponse::Ok().json(LeaveListResponse {
            data,
            page: scope.page,
            per_page: scope.per_page,
            total,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(example = "Enjoy your break")]
    pub comment: Option<String>,
}

/* =========================
Apply for leave / WFH / comp-off
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = ApplyLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request created as pending", body = LeaveRequest),
        (status = 400, description = "Invalid date range or category rules"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Overlaps an existing request"),
        (status = 422, description = "Insufficient balance")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ApplyLeave>,
) -> AppResult<HttpResponse> {
    let request = state.leave.apply(&auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(request))
}

/// Caller's own requests
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let page = state
        .leave
        .list_for_identity(auth.user_id, &query.scope())
        .await?;
    Ok(query.respond(page))
}

/// Pending requests the caller may decide (manager/admin)
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated pending list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let page = state.leave.list_pending(&auth, &query.scope()).await?;
    Ok(query.respond(page))
}

/// All requests in the caller's scope (manager/admin)
#[utoipa::path(
    get,
    path = "/api/leave/all",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn all_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let page = state.leave.list_all(&auth, &query.scope()).await?;
    Ok(query.respond(page))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = state.leave.get(&auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

async fn decide(
    auth: AuthUser,
    state: web::Data<AppState>,
    leave_id: u64,
    decision: Decision,
    body: Option<web::Json<DecisionBody>>,
) -> AppResult<HttpResponse> {
    let comment = body.and_then(|b| b.into_inner().comment);
    let request = state
        .leave
        .decide(&auth, leave_id, decision, comment)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already decided or cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, state, path.into_inner(), Decision::Approve, body).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Leave rejected and balance restored", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already decided or cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, state, path.into_inner(), Decision::Reject, body).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled and balance restored", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not found, or neither owner nor admin"),
        (status = 409, description = "Request no longer pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = state.leave.cancel(&auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    get,
    path = "/api/leave/balances",
    responses(
        (status = 200, description = "Caller's balance per leave type", body = [LeaveBalance]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_balances(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let balances = state.ledger.balances(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[derive(Serialize, ToSchema)]
pub struct TypeBalance {
    pub leave_type: LeaveType,
    pub balance: Decimal,
}

#[utoipa::path(
    get,
    path = "/api/leave/balances/{leave_type}",
    params(("leave_type" = LeaveType, Path, description = "casual, sick, earned or comp_off")),
    responses(
        (status = 200, description = "Caller's balance for one leave type", body = TypeBalance),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown leave type")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_balance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<LeaveType>,
) -> AppResult<HttpResponse> {
    let leave_type = path.into_inner();
    let balance = state.ledger.read(auth.user_id, leave_type).await?;
    Ok(HttpResponse::Ok().json(TypeBalance {
        leave_type,
        balance,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/lop",
    responses(
        (status = 200, description = "Caller's loss-of-pay records", body = [LopRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_lop_records(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let records = state.store.list_lop_records(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(records))
}
