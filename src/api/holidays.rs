use crate::{auth::auth::AuthUser, error::AppResult, state::AppState};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Calendar year, defaults to the current one
    pub year: Option<i32>,
}

/// Anonymous callers see company-wide holidays; a bearer token adds the
/// caller's department holidays.
#[utoipa::path(
    get,
    path = "/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays in scope for the caller", body = [Holiday])
    ),
    security((), ("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn list_holidays(
    auth: Option<AuthUser>,
    state: web::Data<AppState>,
    query: web::Query<HolidayQuery>,
) -> AppResult<HttpResponse> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let department_id = auth.and_then(|a| a.department_id);

    let holidays = state.calendar.for_scope(year, department_id).await?;
    Ok(HttpResponse::Ok().json(holidays))
}
