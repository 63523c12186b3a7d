//! Closed error taxonomy shared by the auth chain and the leave core.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::model::{
    leave_request::LeaveStatus,
    leave_type::LeaveType,
    role::Role,
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// No usable bearer credential on the request.
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    /// Token was valid but points at an identity that no longer exists.
    #[error("unknown identity")]
    UnknownIdentity,

    #[error("account is deactivated")]
    AccountDeactivated,

    #[error("access denied{}", role_suffix(.allowed))]
    Forbidden { allowed: Vec<Role> },

    #[error("insufficient {leave_type} balance: available {available}, requested {requested}")]
    InsufficientBalance {
        leave_type: LeaveType,
        available: Decimal,
        requested: Decimal,
    },

    #[error("overlaps existing request {existing_id}")]
    OverlappingRequest { existing_id: u64 },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Detail is logged, never sent to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

fn role_suffix(roles: &[Role]) -> String {
    if roles.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = roles.iter().map(|r| r.as_ref()).collect();
    format!(", requires one of: {}", names.join(", "))
}

impl AppError {
    pub fn forbidden(allowed: &[Role]) -> Self {
        Self::Forbidden {
            allowed: allowed.to_vec(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::UnknownIdentity => StatusCode::UNAUTHORIZED,
            Self::AccountDeactivated | Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OverlappingRequest { .. }
            | Self::InvalidTransition { .. }
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::UnknownIdentity => "UNKNOWN_IDENTITY",
            Self::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::OverlappingRequest { .. } => "OVERLAPPING_REQUEST",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Request failed with internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status()).json(json!({
            "error": self.error_code(),
            "message": message,
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        Self::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn auth_failures_are_401_but_deactivation_is_403() {
        for err in [
            AppError::Unauthenticated,
            AppError::InvalidCredentials,
            AppError::InvalidToken,
            AppError::ExpiredToken,
            AppError::UnknownIdentity,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(AppError::AccountDeactivated.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::AccountDeactivated.error_code(),
            "ACCOUNT_DEACTIVATED"
        );
    }

    #[test]
    fn forbidden_lists_accepted_roles() {
        let err = AppError::forbidden(&[Role::Manager, Role::Admin]);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "access denied, requires one of: manager, admin");
        assert_eq!(AppError::forbidden(&[]).to_string(), "access denied");
    }

    #[test]
    fn lifecycle_errors_have_stable_codes() {
        let err = AppError::InvalidTransition {
            from: LeaveStatus::Approved,
            to: LeaveStatus::Rejected,
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("approved"));

        let err = AppError::InsufficientBalance {
            leave_type: LeaveType::Casual,
            available: Decimal::ONE,
            requested: Decimal::TWO,
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
    }

    #[actix_web::test]
    async fn internal_error_hides_detail() {
        let resp = AppError::internal("connection refused on 10.0.0.3").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("INTERNAL_ERROR"));
        assert!(!text.contains("10.0.0.3"));
    }
}
