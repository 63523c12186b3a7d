//! Monthly accrual and loss-of-pay conversion.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    leave::ledger::Ledger,
    model::{
        leave_balance::AccrualOutcome, leave_type::LeaveType, period::AccrualPeriod,
        settings::AccrualRate,
    },
    store::Store,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemFailure {
    pub user_id: u64,
    pub error: String,
}

/// What one identity got out of an accrual run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IdentityAccrual {
    pub user_id: u64,
    pub credited: Decimal,
    /// Leave types already accrued for the period.
    pub skipped: u64,
    /// Set when the run stopped early for this identity.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccrualReport {
    #[schema(value_type = String, example = "2026-01")]
    pub period: AccrualPeriod,
    pub identities: u64,
    /// Balance entries that received a non-zero credit.
    pub credited: u64,
    /// Entries already accrued for this period.
    pub skipped: u64,
    pub total_credited: Decimal,
    /// Days converted to LOP when auto-conversion ran afterwards.
    pub converted: Option<Decimal>,
    pub outcomes: Vec<IdentityAccrual>,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ConversionReport {
    pub identities: u64,
    pub converted_days: Decimal,
    pub failures: Vec<ItemFailure>,
}

pub fn current_period() -> AccrualPeriod {
    AccrualPeriod::containing(Utc::now().date_naive())
}

pub struct AccrualEngine {
    store: Arc<dyn Store>,
    ledger: Arc<Ledger>,
}

impl AccrualEngine {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<Ledger>) -> Self {
        Self { store, ledger }
    }

    async fn active_rates(&self) -> AppResult<Vec<AccrualRate>> {
        let mut rates = Vec::new();
        for leave_type in LeaveType::iter() {
            let rate = self.store.accrual_rate(leave_type).await?;
            if rate.monthly_amount > Decimal::ZERO {
                rates.push(rate);
            }
        }
        Ok(rates)
    }

    /// Credits every active identity once per (leave type, period).
    /// Re-running a period changes nothing.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn run_monthly_accrual(&self, period: AccrualPeriod) -> AppResult<AccrualReport> {
        let rates = self.active_rates().await?;
        let identities = self.store.list_identities(true).await?;

        let mut report = AccrualReport {
            period,
            identities: identities.len() as u64,
            credited: 0,
            skipped: 0,
            total_credited: Decimal::ZERO,
            converted: None,
            outcomes: Vec::with_capacity(identities.len()),
            failures: Vec::new(),
        };

        for identity in &identities {
            let mut outcome = IdentityAccrual {
                user_id: identity.id,
                credited: Decimal::ZERO,
                skipped: 0,
                error: None,
            };
            for rate in &rates {
                match self.store.accrue(identity.id, rate, period).await {
                    Ok(AccrualOutcome::Credited { amount, .. }) => {
                        if amount > Decimal::ZERO {
                            report.credited += 1;
                            report.total_credited += amount;
                            outcome.credited += amount;
                        }
                    }
                    Ok(AccrualOutcome::AlreadyApplied) => {
                        report.skipped += 1;
                        outcome.skipped += 1;
                    }
                    Err(e) => {
                        error!(user_id = identity.id, error = %e, "Accrual failed");
                        report.failures.push(ItemFailure {
                            user_id: identity.id,
                            error: e.to_string(),
                        });
                        outcome.error = Some(e.to_string());
                        break;
                    }
                }
            }
            report.outcomes.push(outcome);
        }

        let settings = self.store.lop_settings().await?;
        if settings.auto_convert_after_accrual && settings.conversion_enabled {
            let conversion = self.bulk_convert_negative_balances().await?;
            report.failures.extend(conversion.failures);
            report.converted = Some(conversion.converted_days);
        }

        info!(
            credited = report.credited,
            skipped = report.skipped,
            failures = report.failures.len(),
            "Monthly accrual finished"
        );
        Ok(report)
    }

    async fn ensure_conversion_enabled(&self) -> AppResult<()> {
        if !self.store.lop_settings().await?.conversion_enabled {
            return Err(AppError::validation("LOP conversion is disabled"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn bulk_convert_negative_balances(&self) -> AppResult<ConversionReport> {
        self.ensure_conversion_enabled().await?;
        let identities = self.store.list_identities(false).await?;

        let mut report = ConversionReport {
            identities: identities.len() as u64,
            ..ConversionReport::default()
        };
        for identity in &identities {
            match self.ledger.convert_negative_to_lop(identity.id).await {
                Ok(days) => report.converted_days += days,
                Err(e) => {
                    error!(user_id = identity.id, error = %e, "LOP conversion failed");
                    report.failures.push(ItemFailure {
                        user_id: identity.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(converted_days = %report.converted_days, "Bulk LOP conversion finished");
        Ok(report)
    }

    pub async fn convert_user_negative_balances(&self, user_id: u64) -> AppResult<Decimal> {
        self.ensure_conversion_enabled().await?;
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found(format!("user {user_id}")));
        }
        self.ledger.convert_negative_to_lop(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{role::Role, settings::LopSettings, user::NewIdentity},
        store::{IdentityStore, MemoryStore, SettingsStore},
    };
    use rust_decimal_macros::dec;

    struct Fixture {
        engine: AccrualEngine,
        ledger: Arc<Ledger>,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(store.clone()));
        Fixture {
            engine: AccrualEngine::new(store.clone(), ledger.clone()),
            ledger,
            store,
        }
    }

    async fn add_user(store: &MemoryStore, name: &str) -> u64 {
        store
            .insert_identity(NewIdentity {
                username: name.into(),
                password_hash: "x".into(),
                role: Role::Employee,
                department_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn period(s: &str) -> AccrualPeriod {
        s.parse().unwrap()
    }

    #[actix_web::test]
    async fn accrual_is_idempotent_per_period() {
        let f = fixture();
        let user = add_user(&f.store, "a").await;

        let first = f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        assert_eq!(first.credited, 1);
        assert_eq!(first.total_credited, dec!(1.5));

        let again = f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        assert_eq!(again.credited, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(f.ledger.read(user, LeaveType::Earned).await.unwrap(), dec!(1.5));

        f.engine.run_monthly_accrual(period("2026-02")).await.unwrap();
        assert_eq!(f.ledger.read(user, LeaveType::Earned).await.unwrap(), dec!(3));

        // an older period never re-credits
        f.engine.run_monthly_accrual(period("2025-12")).await.unwrap();
        assert_eq!(f.ledger.read(user, LeaveType::Earned).await.unwrap(), dec!(3));
    }

    #[actix_web::test]
    async fn report_lists_each_identity() {
        let f = fixture();
        let early = add_user(&f.store, "early").await;
        f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        let late = add_user(&f.store, "late").await;

        let report = f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        assert_eq!(report.outcomes.len(), 2);

        let outcome = |id: u64| report.outcomes.iter().find(|o| o.user_id == id).unwrap();
        assert_eq!(outcome(early).credited, dec!(0));
        assert_eq!(outcome(early).skipped, 1);
        assert_eq!(outcome(late).credited, dec!(1.5));
        assert_eq!(outcome(late).skipped, 0);
        assert!(report.outcomes.iter().all(|o| o.error.is_none()));
    }

    #[actix_web::test]
    async fn accrual_stops_at_cap() {
        let f = fixture();
        let user = add_user(&f.store, "a").await;
        f.store
            .put_accrual_rate(&AccrualRate {
                leave_type: LeaveType::Earned,
                monthly_amount: dec!(2),
                max_balance: Some(dec!(3)),
            })
            .await
            .unwrap();

        f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        f.engine.run_monthly_accrual(period("2026-02")).await.unwrap();
        let third = f.engine.run_monthly_accrual(period("2026-03")).await.unwrap();
        assert_eq!(third.credited, 0);
        assert_eq!(f.ledger.read(user, LeaveType::Earned).await.unwrap(), dec!(3));
    }

    #[actix_web::test]
    async fn deactivated_identities_do_not_accrue() {
        let f = fixture();
        let user = add_user(&f.store, "a").await;
        f.store.set_active(user, false).await.unwrap();

        let report = f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        assert_eq!(report.identities, 0);
        assert_eq!(f.ledger.read(user, LeaveType::Earned).await.unwrap(), dec!(0));
    }

    #[actix_web::test]
    async fn bulk_conversion_zeroes_negatives_once() {
        let f = fixture();
        let a = add_user(&f.store, "a").await;
        let b = add_user(&f.store, "b").await;
        f.ledger.debit(a, LeaveType::Casual, dec!(3)).await.unwrap();
        f.ledger.debit(b, LeaveType::Sick, dec!(1)).await.unwrap();

        let report = f.engine.bulk_convert_negative_balances().await.unwrap();
        assert_eq!(report.converted_days, dec!(4));
        assert!(report.failures.is_empty());
        assert_eq!(f.ledger.read(a, LeaveType::Casual).await.unwrap(), dec!(0));

        let again = f.engine.bulk_convert_negative_balances().await.unwrap();
        assert_eq!(again.converted_days, dec!(0));
    }

    #[actix_web::test]
    async fn disabled_conversion_is_a_validation_error() {
        let f = fixture();
        let a = add_user(&f.store, "a").await;
        f.ledger.debit(a, LeaveType::Casual, dec!(2)).await.unwrap();
        f.store
            .put_lop_settings(&LopSettings {
                conversion_enabled: false,
                ..LopSettings::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            f.engine.bulk_convert_negative_balances().await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.engine.convert_user_negative_balances(a).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(f.ledger.read(a, LeaveType::Casual).await.unwrap(), dec!(-2));
    }

    #[actix_web::test]
    async fn accrual_can_convert_afterwards() {
        let f = fixture();
        let a = add_user(&f.store, "a").await;
        f.ledger.debit(a, LeaveType::Casual, dec!(2)).await.unwrap();
        f.store
            .put_lop_settings(&LopSettings {
                auto_convert_after_accrual: true,
                ..LopSettings::default()
            })
            .await
            .unwrap();

        let report = f.engine.run_monthly_accrual(period("2026-01")).await.unwrap();
        assert_eq!(report.converted, Some(dec!(2)));
        assert_eq!(f.ledger.read(a, LeaveType::Casual).await.unwrap(), dec!(0));
    }

    #[actix_web::test]
    async fn single_user_conversion_requires_known_user() {
        let f = fixture();
        assert!(matches!(
            f.engine.convert_user_negative_balances(42).await,
            Err(AppError::NotFound(_))
        ));
    }
}
