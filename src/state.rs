use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::{password::hash_password, verifier::CredentialVerifier},
    config::Config,
    error::{AppError, AppResult},
    leave::{
        accrual::AccrualEngine, calendar::HolidayCalendar, ledger::Ledger,
        lifecycle::LeaveService,
    },
    model::{role::Role, user::NewIdentity},
    store::Store,
};

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub verifier: CredentialVerifier,
    pub ledger: Arc<Ledger>,
    pub calendar: Arc<HolidayCalendar>,
    pub leave: LeaveService,
    pub accrual: AccrualEngine,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let ledger = Arc::new(Ledger::new(store.clone()));
        let calendar = Arc::new(HolidayCalendar::new(store.clone()));

        Self {
            verifier: CredentialVerifier::new(store.clone(), config.jwt_secret.clone()),
            leave: LeaveService::new(store.clone(), ledger.clone(), calendar.clone()),
            accrual: AccrualEngine::new(store.clone(), ledger.clone()),
            ledger,
            calendar,
            store,
            config,
        }
    }

    /// Creates the configured admin account unless the username exists.
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let Some((username, password)) = &self.config.bootstrap_admin else {
            return Ok(());
        };

        if let Some(existing) = self.store.find_by_username(username).await? {
            if existing.role != Role::Admin {
                warn!(username = %username, "Bootstrap username exists without admin role");
            }
            return Ok(());
        }

        let password_hash = hash_password(password)
            .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))?;
        let admin = self
            .store
            .insert_identity(NewIdentity {
                username: username.clone(),
                password_hash,
                role: Role::Admin,
                department_id: None,
            })
            .await?;
        self.ledger.grant_quota(admin.id).await?;

        info!(user_id = admin.id, username = %username, "Bootstrap admin created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IdentityStore, MemoryStore};

    #[actix_web::test]
    async fn bootstrap_admin_is_created_once() {
        let mut config = Config::for_tests();
        config.bootstrap_admin = Some(("root".into(), "change-me-now".into()));
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());

        state.ensure_bootstrap_admin().await.unwrap();
        state.ensure_bootstrap_admin().await.unwrap();

        let all = store.list_identities(false).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, Role::Admin);
    }
}
