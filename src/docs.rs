use crate::api::admin::{
    AccrualRun, ActiveUpdate, BalanceAdjustment, RoleUpdate, UserConversion,
};
use crate::api::leave_request::{DecisionBody, LeaveFilter, LeaveListResponse, TypeBalance};
use crate::auth::handlers::MeResponse;
use crate::leave::accrual::{AccrualReport, ConversionReport, IdentityAccrual, ItemFailure};
use crate::leave::lifecycle::ApplyLeave;
use crate::model::{
    holiday::{Holiday, NewHoliday},
    leave_balance::{LeaveBalance, LopRecord},
    leave_request::{LeaveRequest, LeaveStatus},
    leave_type::{LeaveCategory, LeaveType},
    role::Role,
    settings::{AccrualRate, LopSettings, QuotaConfig},
    user::Identity,
};
use crate::models::{LoginReqDto, RegisterReqDto, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave management backend

Employees apply for leave, work-from-home and comp-off; managers and admins
decide; admins configure quotas, accrual, holidays and loss-of-pay.

### Key Features
- **Leave lifecycle**: apply, approve or reject, cancel while pending
- **Balances**: per-type ledger with configurable overdraft, monthly accrual
- **Loss of pay**: negative balances converted into LOP records
- **Holidays**: company-wide or per department

### Security
Endpoints under `/api` require a **JWT Bearer** access token. `/api/admin`
additionally requires the `admin` role. `GET /holidays` accepts an optional
token.

### Errors
Failures return `{"error": CODE, "message": text}` with a stable code.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::holidays::list_holidays,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::pending_list,
        crate::api::leave_request::all_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::my_balances,
        crate::api::leave_request::my_balance,
        crate::api::leave_request::my_lop_records,

        crate::api::admin::list_users,
        crate::api::admin::update_role,
        crate::api::admin::set_active,
        crate::api::admin::user_balances,
        crate::api::admin::adjust_balance,
        crate::api::admin::user_lop_records,
        crate::api::admin::convert_user_lop,
        crate::api::admin::convert_all_lop,
        crate::api::admin::run_accrual,
        crate::api::admin::list_quotas,
        crate::api::admin::put_quota,
        crate::api::admin::list_accrual_rates,
        crate::api::admin::put_accrual_rate,
        crate::api::admin::get_lop_settings,
        crate::api::admin::put_lop_settings,
        crate::api::admin::list_holidays,
        crate::api::admin::add_holiday,
        crate::api::admin::delete_holiday
    ),
    components(
        schemas(
            RegisterReqDto,
            LoginReqDto,
            TokenPair,
            MeResponse,
            Identity,
            Role,
            LeaveType,
            LeaveCategory,
            LeaveStatus,
            LeaveRequest,
            ApplyLeave,
            DecisionBody,
            LeaveFilter,
            LeaveListResponse,
            LeaveBalance,
            TypeBalance,
            LopRecord,
            Holiday,
            NewHoliday,
            QuotaConfig,
            AccrualRate,
            LopSettings,
            RoleUpdate,
            ActiveUpdate,
            BalanceAdjustment,
            AccrualRun,
            AccrualReport,
            IdentityAccrual,
            ConversionReport,
            ItemFailure,
            UserConversion
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, sessions and the caller's profile"),
        (name = "Leave", description = "Leave, WFH and comp-off requests"),
        (name = "Holidays", description = "Holiday calendar"),
        (name = "Admin", description = "Identity, policy and batch administration"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/holidays"));
    }
}
