use crate::auth::auth::AuthUser;
use crate::auth::gate::RoleGate;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use tracing::debug;

fn app_state(req: &ServiceRequest) -> Result<Data<AppState>, Error> {
    req.app_data::<Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::internal("application state missing").into())
}

fn authorization(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
}

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    req.into_response(err.error_response())
}

/// Requires a valid access token for an active identity.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let state = app_state(&req)?;
    let header = authorization(&req);

    match state.verifier.verify_header(header.as_deref()).await {
        Ok(identity) => {
            req.extensions_mut().insert(AuthUser::from(&identity));
            next.call(req).await
        }
        Err(e) => {
            debug!(error = %e, path = %req.path(), "Authentication failed");
            Ok(reject(req, e))
        }
    }
}

/// Attaches the caller when the token verifies; otherwise continues anonymous.
pub async fn optional_auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let state = app_state(&req)?;
    let header = authorization(&req);

    if header.is_some() {
        match state.verifier.verify_header(header.as_deref()).await {
            Ok(identity) => {
                req.extensions_mut().insert(AuthUser::from(&identity));
            }
            Err(e) => debug!(error = %e, "Optional auth ignored credential"),
        }
    }

    next.call(req).await
}

/// Must run inside `auth_middleware`.
pub async fn admin_gate(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let verdict = RoleGate::ADMIN.check(req.extensions().get::<AuthUser>());

    match verdict {
        Ok(()) => next.call(req).await,
        Err(e) => Ok(reject(req, e)),
    }
}
