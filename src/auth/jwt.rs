use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    model::user::Identity,
    models::{Claims, TokenType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::InvalidToken,
        }
    }
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    identity: &Identity,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), AppError> {
    let issued_at = now();
    let claims = Claims {
        user_id: identity.id,
        sub: identity.username.clone(),
        role: identity.role,
        iat: issued_at,
        exp: issued_at + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("failed to encode token: {e}")))?;

    Ok((token, claims))
}

pub fn generate_access_token(
    identity: &Identity,
    secret: &str,
    ttl: usize,
) -> Result<String, AppError> {
    issue(identity, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    identity: &Identity,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), AppError> {
    issue(identity, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Encodes arbitrary claims; only tests need tokens the issuer would not mint.
#[cfg(test)]
pub fn encode_claims(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
pub fn claims_for(
    user_id: u64,
    role: crate::model::role::Role,
    token_type: TokenType,
    exp: usize,
) -> Claims {
    Claims {
        user_id,
        sub: format!("user{user_id}"),
        role,
        iat: now(),
        exp,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    const SECRET: &str = "test-secret";

    fn identity() -> Identity {
        Identity {
            id: 42,
            username: "jdoe".into(),
            password_hash: String::new(),
            role: Role::Manager,
            department_id: Some(3),
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn access_token_round_trips_claims() {
        let token = generate_access_token(&identity(), SECRET, 900).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_carries_unique_jti() {
        let (_, a) = generate_refresh_token(&identity(), SECRET, 60).unwrap();
        let (_, b) = generate_refresh_token(&identity(), SECRET, 60).unwrap();
        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_and_forged_tokens_are_distinguished() {
        let past = now() - 3600;
        let claims = claims_for(1, Role::Employee, TokenType::Access, past);
        let expired = encode_claims(&claims, SECRET);
        assert_eq!(verify_token(&expired, SECRET).unwrap_err(), TokenError::Expired);

        let token = generate_access_token(&identity(), SECRET, 900).unwrap();
        assert_eq!(
            verify_token(&token, "other-secret").unwrap_err(),
            TokenError::Invalid
        );
        assert_eq!(
            verify_token("not.a.jwt", SECRET).unwrap_err(),
            TokenError::Invalid
        );
    }
}
