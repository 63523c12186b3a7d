use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
        verifier::bearer_token,
    },
    error::{AppError, AppResult},
    model::{leave_balance::LeaveBalance, role::Role, user::{Identity, NewIdentity}},
    models::{LoginReqDto, RegisterReqDto, TokenPair, TokenType},
    state::AppState,
};
use actix_web::{HttpRequest, HttpResponse, http::header::AUTHORIZATION, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 64;

/// Issues an access/refresh pair and records the refresh jti.
async fn issue_tokens(state: &AppState, identity: &Identity) -> AppResult<TokenPair> {
    let config = &state.config;
    let access_token =
        generate_access_token(identity, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(identity, &config.jwt_secret, config.refresh_token_ttl)?;

    let expires_at = DateTime::<Utc>::from_timestamp(refresh_claims.exp as i64, 0)
        .ok_or_else(|| AppError::internal("refresh expiry out of range"))?;

    debug!(user_id = identity.id, jti = %refresh_claims.jti, "Storing refresh token");
    state
        .store
        .store_refresh_token(identity.id, &refresh_claims.jti, expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn header_token(req: &HttpRequest) -> AppResult<&str> {
    bearer_token(req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok()))
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReqDto,
    responses(
        (status = 201, description = "Identity created with employee role", body = Identity),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, user), fields(username = %user.username))]
pub async fn register(
    user: web::Json<RegisterReqDto>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let user = user.into_inner();
    let username = user.username.trim();

    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username must be 1 to {MAX_USERNAME_LEN} characters"
        )));
    }
    if user.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&user.password)
        .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))?;

    let identity = state
        .store
        .insert_identity(NewIdentity {
            username: username.to_string(),
            password_hash,
            role: Role::Employee,
            department_id: user.department_id,
        })
        .await?;
    state.ledger.grant_quota(identity.id).await?;

    info!(user_id = identity.id, "User registered");
    Ok(HttpResponse::Created().json(identity))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::validation("username and password are required"));
    }

    let identity = match state.store.find_by_username(user.username.trim()).await? {
        Some(identity) => identity,
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::InvalidCredentials);
        }
    };

    if let Err(e) = verify_password(&user.password, &identity.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    if !identity.is_active {
        info!(user_id = identity.id, "Login refused for deactivated account");
        return Err(AppError::AccountDeactivated);
    }

    let tokens = issue_tokens(&state, &identity).await?;

    if let Err(e) = state.store.record_login(identity.id).await {
        // login still succeeds
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = identity.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchanges a refresh token (sent as the bearer credential) for a new pair.
/// The presented token is revoked.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token"),
        (status = 403, description = "Account deactivated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let token = header_token(&req)?;
    let claims = verify_token(token, &state.config.jwt_secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::InvalidToken);
    }

    let user_id = state
        .store
        .consume_refresh_token(&claims.jti)
        .await?
        .ok_or(AppError::InvalidToken)?;

    let identity = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UnknownIdentity)?;
    if !identity.is_active {
        return Err(AppError::AccountDeactivated);
    }

    let tokens = issue_tokens(&state, &identity).await?;
    debug!(user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let Ok(token) = header_token(&req) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    if let Ok(claims) = verify_token(token, &state.config.jwt_secret) {
        if claims.token_type == TokenType::Refresh {
            state.store.revoke_refresh_token(&claims.jti).await?;
            debug!(user_id = claims.user_id, "Refresh token revoked");
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub identity: Identity,
    pub balances: Vec<LeaveBalance>,
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Caller identity and balances", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let identity = state
        .store
        .find_by_id(auth.user_id)
        .await?
        .ok_or(AppError::UnknownIdentity)?;
    let balances = state.ledger.balances(auth.user_id).await?;

    Ok(HttpResponse::Ok().json(MeResponse { identity, balances }))
}
