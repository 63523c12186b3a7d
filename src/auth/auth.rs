use crate::{
    auth::gate::RoleGate,
    error::AppError,
    model::{role::Role, user::Identity},
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;

/// Verified caller, placed in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Org unit used to scope manager decisions
    pub department_id: Option<u64>,
}

impl From<&Identity> for AuthUser {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username.clone(),
            role: identity.role,
            department_id: identity.department_id,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(AppError::Unauthenticated),
        )
    }
}

impl AuthUser {
    pub fn require_any(&self, gate: RoleGate) -> Result<(), AppError> {
        gate.check(Some(self))
    }

    pub fn require_approver(&self) -> Result<(), AppError> {
        self.require_any(RoleGate::APPROVERS)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
