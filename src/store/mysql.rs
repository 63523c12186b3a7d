use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};

use super::{BalanceStore, HolidayStore, IdentityStore, RequestStore, SessionStore, SettingsStore};
use crate::{
    error::{AppError, AppResult},
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

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::internal(format!("unexpected {column} value {value:?}")))
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.code().as_deref() == Some("23000");
    }
    false
}

// -------------------- Row types --------------------

#[derive(FromRow)]
struct IdentityRow {
    id: u64,
    username: String,
    password: String,
    role: String,
    department_id: Option<u64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = AppError;

    fn try_from(row: IdentityRow) -> AppResult<Self> {
        Ok(Identity {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            role: parse_column("role", &row.role)?,
            department_id: row.department_id,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(FromRow)]
struct BalanceRow {
    user_id: u64,
    leave_type: String,
    balance: Decimal,
    last_accrual_period: Option<String>,
}

impl TryFrom<BalanceRow> for LeaveBalance {
    type Error = AppError;

    fn try_from(row: BalanceRow) -> AppResult<Self> {
        Ok(LeaveBalance {
            user_id: row.user_id,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            balance: row.balance,
            last_accrual_period: row
                .last_accrual_period
                .as_deref()
                .map(|p| parse_column::<AccrualPeriod>("last_accrual_period", p))
                .transpose()?,
        })
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    user_id: u64,
    category: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    half_day: bool,
    days: Decimal,
    reason: Option<String>,
    documents: Option<String>,
    status: String,
    decided_by: Option<u64>,
    decided_at: Option<DateTime<Utc>>,
    decision_comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRequestRow) -> AppResult<Self> {
        let documents = match row.documents.as_deref() {
            Some(json) if !json.is_empty() => serde_json::from_str(json)?,
            _ => Vec::new(),
        };
        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            category: parse_column("category", &row.category)?,
            start_date: row.start_date,
            end_date: row.end_date,
            half_day: row.half_day,
            days: row.days,
            reason: row.reason,
            documents,
            status: parse_column("status", &row.status)?,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
            decision_comment: row.decision_comment,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LopRecordRow {
    id: u64,
    user_id: u64,
    leave_type: String,
    days: Decimal,
    deduction: Decimal,
    recorded_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct HolidayRow {
    id: u64,
    holiday_date: NaiveDate,
    label: String,
    department_id: Option<u64>,
}

impl From<HolidayRow> for Holiday {
    fn from(row: HolidayRow) -> Self {
        Holiday {
            id: row.id,
            date: row.holiday_date,
            label: row.label,
            department_id: row.department_id,
        }
    }
}

const IDENTITY_COLUMNS: &str =
    "id, username, password, role, department_id, is_active, created_at, last_login_at";

const REQUEST_COLUMNS: &str = "r.id, r.user_id, r.category, r.start_date, r.end_date, r.half_day, \
     r.days, r.reason, r.documents, r.status, r.decided_by, r.decided_at, r.decision_comment, \
     r.created_at";

// -------------------- Identities & sessions --------------------

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn find_by_id(&self, id: u64) -> AppResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Identity::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(username.to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(Identity::try_from)
            .transpose()
    }

    async fn insert_identity(&self, new: NewIdentity) -> AppResult<Identity> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password, role, department_id, is_active)
            VALUES (?, ?, ?, ?, TRUE)
            "#,
        )
        .bind(new.username.to_lowercase())
        .bind(&new.password_hash)
        .bind(new.role.as_ref())
        .bind(new.department_id)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_id(),
            Err(e) if is_duplicate_key(&e) => {
                return Err(AppError::Conflict("Username already taken".into()));
            }
            Err(e) => return Err(e.into()),
        };

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal("inserted user vanished"))
    }

    async fn update_role(&self, id: u64, role: Role) -> AppResult<bool> {
        let done = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0 || self.find_by_id(id).await?.is_some())
    }

    async fn set_active(&self, id: u64, active: bool) -> AppResult<bool> {
        let done = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0 || self.find_by_id(id).await?.is_some())
    }

    async fn list_identities(&self, active_only: bool) -> AppResult<Vec<Identity>> {
        let sql = if active_only {
            format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE is_active = TRUE ORDER BY id")
        } else {
            format!("SELECT {IDENTITY_COLUMNS} FROM users ORDER BY id")
        };
        sqlx::query_as::<_, IdentityRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Identity::try_from)
            .collect()
    }

    async fn record_login(&self, id: u64) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = UTC_TIMESTAMP() WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MySqlStore {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>> {
        let done = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ? AND revoked = FALSE AND expires_at > UTC_TIMESTAMP()
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Ok(None);
        }

        let user_id = sqlx::query_scalar::<_, u64>("SELECT user_id FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user_id)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// -------------------- Ledger --------------------

#[async_trait]
impl BalanceStore for MySqlStore {
    async fn get_balance(
        &self,
        user_id: u64,
        leave_type: LeaveType,
    ) -> AppResult<Option<LeaveBalance>> {
        sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT user_id, leave_type, balance, last_accrual_period
            FROM leave_balances
            WHERE user_id = ? AND leave_type = ?
            "#,
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(LeaveBalance::try_from)
        .transpose()
    }

    async fn list_balances(&self, user_id: u64) -> AppResult<Vec<LeaveBalance>> {
        sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT user_id, leave_type, balance, last_accrual_period
            FROM leave_balances
            WHERE user_id = ?
            ORDER BY leave_type
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LeaveBalance::try_from)
        .collect()
    }

    async fn init_balance(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        amount: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT IGNORE INTO leave_balances (user_id, leave_type, balance) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_delta(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        delta: Decimal,
        floor: Option<Decimal>,
    ) -> AppResult<BalanceChange> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT IGNORE INTO leave_balances (user_id, leave_type, balance) VALUES (?, ?, 0)",
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .execute(&mut *tx)
        .await?;

        // The floor check and the write are one statement; the row lock it
        // takes is what serializes concurrent debits.
        let done = match floor {
            Some(floor) => {
                sqlx::query(
                    r#"
                    UPDATE leave_balances
                    SET balance = balance + ?
                    WHERE user_id = ? AND leave_type = ? AND balance + ? >= ?
                    "#,
                )
                .bind(delta)
                .bind(user_id)
                .bind(leave_type.as_ref())
                .bind(delta)
                .bind(floor)
                .execute(&mut *tx)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE leave_balances
                    SET balance = balance + ?
                    WHERE user_id = ? AND leave_type = ?
                    "#,
                )
                .bind(delta)
                .bind(user_id)
                .bind(leave_type.as_ref())
                .execute(&mut *tx)
                .await?
            }
        };

        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM leave_balances WHERE user_id = ? AND leave_type = ?",
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if done.rows_affected() == 1 {
            BalanceChange::Applied { balance }
        } else {
            BalanceChange::Rejected { balance }
        })
    }

    async fn accrue(
        &self,
        user_id: u64,
        rate: &AccrualRate,
        period: AccrualPeriod,
    ) -> AppResult<AccrualOutcome> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT IGNORE INTO leave_balances (user_id, leave_type, balance) VALUES (?, ?, 0)",
        )
        .bind(user_id)
        .bind(rate.leave_type.as_ref())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT user_id, leave_type, balance, last_accrual_period
            FROM leave_balances
            WHERE user_id = ? AND leave_type = ?
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(rate.leave_type.as_ref())
        .fetch_one(&mut *tx)
        .await?;
        let current = LeaveBalance::try_from(row)?;

        if current.last_accrual_period.is_some_and(|last| last >= period) {
            tx.rollback().await?;
            return Ok(AccrualOutcome::AlreadyApplied);
        }

        let amount = rate.credit_for(current.balance);
        sqlx::query(
            r#"
            UPDATE leave_balances
            SET balance = balance + ?, last_accrual_period = ?
            WHERE user_id = ? AND leave_type = ?
            "#,
        )
        .bind(amount)
        .bind(period.to_string())
        .bind(user_id)
        .bind(rate.leave_type.as_ref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AccrualOutcome::Credited {
            amount,
            balance: current.balance + amount,
        })
    }

    async fn convert_negative(
        &self,
        user_id: u64,
        leave_type: LeaveType,
        deduction_per_day: Decimal,
    ) -> AppResult<Decimal> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT balance FROM leave_balances
            WHERE user_id = ? AND leave_type = ?
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .fetch_optional(&mut *tx)
        .await?;

        let days = match balance {
            Some(b) if b < Decimal::ZERO => -b,
            _ => {
                tx.rollback().await?;
                return Ok(Decimal::ZERO);
            }
        };

        sqlx::query(
            r#"
            INSERT INTO lop_records (user_id, leave_type, days, deduction)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(leave_type.as_ref())
        .bind(days)
        .bind(days * deduction_per_day)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE leave_balances SET balance = 0 WHERE user_id = ? AND leave_type = ?")
            .bind(user_id)
            .bind(leave_type.as_ref())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(days)
    }

    async fn list_lop_records(&self, user_id: u64) -> AppResult<Vec<LopRecord>> {
        sqlx::query_as::<_, LopRecordRow>(
            r#"
            SELECT id, user_id, leave_type, days, deduction, recorded_at
            FROM lop_records
            WHERE user_id = ?
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(LopRecord {
                id: row.id,
                user_id: row.user_id,
                leave_type: parse_column("leave_type", &row.leave_type)?,
                days: row.days,
                deduction: row.deduction,
                recorded_at: row.recorded_at,
            })
        })
        .collect()
    }
}

// -------------------- Requests --------------------

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[async_trait]
impl RequestStore for MySqlStore {
    async fn insert_request(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        let documents = serde_json::to_string(&new.documents)?;
        let done = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, category, start_date, end_date, half_day, days, reason, documents, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(new.user_id)
        .bind(new.category.as_ref())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.half_day)
        .bind(new.days)
        .bind(&new.reason)
        .bind(documents)
        .execute(&self.pool)
        .await?;

        self.get_request(done.last_insert_id())
            .await?
            .ok_or_else(|| AppError::internal("inserted leave request vanished"))
    }

    async fn get_request(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests r WHERE r.id = ?");
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn find_overlapping(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests r
            WHERE r.user_id = ?
              AND r.status IN ('pending', 'approved')
              AND r.start_date <= ?
              AND r.end_date >= ?
            "#
        );
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(user_id)
            .bind(end)
            .bind(start)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect()
    }

    async fn transition(&self, id: u64, transition: &Transition) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let done = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, decided_by = ?, decided_at = ?, decision_comment = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(transition.to.as_ref())
        .bind(transition.actor)
        .bind(transition.at)
        .bind(&transition.comment)
        .bind(id)
        .bind(transition.from.as_ref())
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() != 1 {
            // dropping the transaction rolls it back
            return Ok(false);
        }

        if let Some((leave_type, amount)) = transition.credit {
            let owner =
                sqlx::query_scalar::<_, u64>("SELECT user_id FROM leave_requests WHERE id = ?")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;

            sqlx::query(
                "INSERT IGNORE INTO leave_balances (user_id, leave_type, balance) VALUES (?, ?, 0)",
            )
            .bind(owner)
            .bind(leave_type.as_ref())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE leave_balances
                SET balance = balance + ?
                WHERE user_id = ? AND leave_type = ?
                "#,
            )
            .bind(amount)
            .bind(owner)
            .bind(leave_type.as_ref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<(Vec<LeaveRequest>, u64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND r.user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        if let Some(dept) = filter.department_id {
            where_sql.push_str(" AND u.department_id = ?");
            args.push(FilterValue::U64(dept));
        }
        if let Some(status) = &filter.status {
            where_sql.push_str(" AND r.status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }
        if let Some(category) = &filter.category {
            where_sql.push_str(" AND r.category = ?");
            args.push(FilterValue::Str(category.as_ref()));
        }

        let from_sql = " FROM leave_requests r JOIN users u ON u.id = r.user_id";

        let count_sql = format!("SELECT COUNT(*){from_sql}{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {REQUEST_COLUMNS}{from_sql}{where_sql} ORDER BY r.id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        let requests = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((requests, total.max(0) as u64))
    }
}

// -------------------- Holidays & settings --------------------

#[async_trait]
impl HolidayStore for MySqlStore {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Holiday>> {
        let rows = sqlx::query_as::<_, HolidayRow>(
            r#"
            SELECT id, holiday_date, label, department_id
            FROM holidays
            WHERE holiday_date BETWEEN ? AND ?
            ORDER BY holiday_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Holiday::from).collect())
    }

    async fn insert_holiday(&self, new: NewHoliday) -> AppResult<Holiday> {
        let done = sqlx::query(
            "INSERT INTO holidays (holiday_date, label, department_id) VALUES (?, ?, ?)",
        )
        .bind(new.date)
        .bind(&new.label)
        .bind(new.department_id)
        .execute(&self.pool)
        .await?;

        Ok(Holiday {
            id: done.last_insert_id(),
            date: new.date,
            label: new.label,
            department_id: new.department_id,
        })
    }

    async fn delete_holiday(&self, id: u64) -> AppResult<bool> {
        let done = sqlx::query("DELETE FROM holidays WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct QuotaRow {
    annual_quota: Decimal,
    allow_negative: bool,
    negative_limit: Decimal,
}

#[derive(FromRow)]
struct AccrualRateRow {
    monthly_amount: Decimal,
    max_balance: Option<Decimal>,
}

#[derive(FromRow)]
struct LopSettingsRow {
    conversion_enabled: bool,
    deduction_per_day: Decimal,
    auto_convert_after_accrual: bool,
}

#[async_trait]
impl SettingsStore for MySqlStore {
    async fn quota(&self, leave_type: LeaveType) -> AppResult<QuotaConfig> {
        let row = sqlx::query_as::<_, QuotaRow>(
            "SELECT annual_quota, allow_negative, negative_limit FROM leave_quotas WHERE leave_type = ?",
        )
        .bind(leave_type.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => QuotaConfig {
                leave_type,
                annual_quota: row.annual_quota,
                allow_negative: row.allow_negative,
                negative_limit: row.negative_limit,
            },
            None => QuotaConfig::default_for(leave_type),
        })
    }

    async fn put_quota(&self, quota: &QuotaConfig) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_quotas (leave_type, annual_quota, allow_negative, negative_limit)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                annual_quota = VALUES(annual_quota),
                allow_negative = VALUES(allow_negative),
                negative_limit = VALUES(negative_limit)
            "#,
        )
        .bind(quota.leave_type.as_ref())
        .bind(quota.annual_quota)
        .bind(quota.allow_negative)
        .bind(quota.negative_limit)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn accrual_rate(&self, leave_type: LeaveType) -> AppResult<AccrualRate> {
        let row = sqlx::query_as::<_, AccrualRateRow>(
            "SELECT monthly_amount, max_balance FROM accrual_rates WHERE leave_type = ?",
        )
        .bind(leave_type.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => AccrualRate {
                leave_type,
                monthly_amount: row.monthly_amount,
                max_balance: row.max_balance,
            },
            None => AccrualRate::default_for(leave_type),
        })
    }

    async fn put_accrual_rate(&self, rate: &AccrualRate) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accrual_rates (leave_type, monthly_amount, max_balance)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                monthly_amount = VALUES(monthly_amount),
                max_balance = VALUES(max_balance)
            "#,
        )
        .bind(rate.leave_type.as_ref())
        .bind(rate.monthly_amount)
        .bind(rate.max_balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn lop_settings(&self) -> AppResult<LopSettings> {
        let row = sqlx::query_as::<_, LopSettingsRow>(
            r#"
            SELECT conversion_enabled, deduction_per_day, auto_convert_after_accrual
            FROM lop_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => LopSettings {
                conversion_enabled: row.conversion_enabled,
                deduction_per_day: row.deduction_per_day,
                auto_convert_after_accrual: row.auto_convert_after_accrual,
            },
            None => LopSettings::default(),
        })
    }

    async fn put_lop_settings(&self, settings: &LopSettings) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lop_settings (id, conversion_enabled, deduction_per_day, auto_convert_after_accrual)
            VALUES (1, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                conversion_enabled = VALUES(conversion_enabled),
                deduction_per_day = VALUES(deduction_per_day),
                auto_convert_after_accrual = VALUES(auto_convert_after_accrual)
            "#,
        )
        .bind(settings.conversion_enabled)
        .bind(settings.deduction_per_day)
        .bind(settings.auto_convert_after_accrual)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
