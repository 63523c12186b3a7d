use std::sync::Arc;

use tracing::debug;

use crate::{
    auth::jwt::verify_token,
    error::{AppError, AppResult},
    model::user::Identity,
    models::TokenType,
    store::Store,
};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> AppResult<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated)
}

/// Turns a bearer token into the live identity it names.
pub struct CredentialVerifier {
    store: Arc<dyn Store>,
    secret: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn Store>, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    pub async fn verify(&self, token: &str) -> AppResult<Identity> {
        let claims = verify_token(token, &self.secret)?;

        if claims.token_type != TokenType::Access {
            debug!(user_id = claims.user_id, "Refresh token presented as access token");
            return Err(AppError::InvalidToken);
        }

        let identity = self
            .store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AppError::UnknownIdentity)?;

        if !identity.is_active {
            debug!(user_id = identity.id, "Rejecting deactivated identity");
            return Err(AppError::AccountDeactivated);
        }

        Ok(identity)
    }

    pub async fn verify_header(&self, header: Option<&str>) -> AppResult<Identity> {
        let token = bearer_token(header)?;
        self.verify(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::{claims_for, encode_claims, generate_access_token, generate_refresh_token},
        model::{role::Role, user::NewIdentity},
        store::{IdentityStore, MemoryStore},
    };
    use chrono::Utc;

    const SECRET: &str = "verifier-secret";

    async fn setup() -> (CredentialVerifier, Arc<MemoryStore>, Identity) {
        let store = Arc::new(MemoryStore::new());
        let identity = store
            .insert_identity(NewIdentity {
                username: "alice".into(),
                password_hash: "x".into(),
                role: Role::Employee,
                department_id: Some(1),
            })
            .await
            .unwrap();
        let verifier = CredentialVerifier::new(store.clone(), SECRET);
        (verifier, store, identity)
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AppError::Unauthenticated)));
        assert!(matches!(
            bearer_token(Some("Basic abc")),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer ")),
            Err(AppError::Unauthenticated)
        ));
    }

    #[actix_web::test]
    async fn valid_token_resolves_stored_identity() {
        let (verifier, _, identity) = setup().await;
        let token = generate_access_token(&identity, SECRET, 900).unwrap();

        let verified = verifier
            .verify_header(Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(verified.id, identity.id);
        assert_eq!(verified.role, Role::Employee);
    }

    #[actix_web::test]
    async fn stored_role_wins_over_token_role() {
        let (verifier, store, identity) = setup().await;
        let token = generate_access_token(&identity, SECRET, 900).unwrap();
        store.update_role(identity.id, Role::Manager).await.unwrap();

        let verified = verifier.verify(&token).await.unwrap();
        assert_eq!(verified.role, Role::Manager);
    }

    #[actix_web::test]
    async fn missing_header_is_unauthenticated() {
        let (verifier, _, _) = setup().await;
        let err = verifier.verify_header(None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[actix_web::test]
    async fn forged_and_expired_tokens_are_told_apart() {
        let (verifier, _, identity) = setup().await;

        let forged = generate_access_token(&identity, "another-secret", 900).unwrap();
        assert!(matches!(
            verifier.verify(&forged).await.unwrap_err(),
            AppError::InvalidToken
        ));

        let past = (Utc::now().timestamp() - 3600) as usize;
        let claims = claims_for(identity.id, Role::Employee, TokenType::Access, past);
        let expired = encode_claims(&claims, SECRET);
        assert!(matches!(
            verifier.verify(&expired).await.unwrap_err(),
            AppError::ExpiredToken
        ));
    }

    #[actix_web::test]
    async fn refresh_token_cannot_authenticate_requests() {
        let (verifier, _, identity) = setup().await;
        let (refresh, _) = generate_refresh_token(&identity, SECRET, 900).unwrap();

        assert!(matches!(
            verifier.verify(&refresh).await.unwrap_err(),
            AppError::InvalidToken
        ));
    }

    #[actix_web::test]
    async fn unknown_and_deactivated_identities_are_rejected() {
        let (verifier, store, identity) = setup().await;

        let future = (Utc::now().timestamp() + 3600) as usize;
        let ghost = encode_claims(&claims_for(999, Role::Admin, TokenType::Access, future), SECRET);
        assert!(matches!(
            verifier.verify(&ghost).await.unwrap_err(),
            AppError::UnknownIdentity
        ));

        let token = generate_access_token(&identity, SECRET, 900).unwrap();
        store.set_active(identity.id, false).await.unwrap();
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AppError::AccountDeactivated));
        assert_eq!(err.status(), actix_web::http::StatusCode::FORBIDDEN);
    }
}
