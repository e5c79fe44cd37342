use crate::engine::ErrorKind;
use crate::orchestration::ServiceError;
use crate::session::SessionError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },
    #[error("{message}")]
    StateConflict { code: &'static str, message: String },
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    #[error("Authentication required")]
    AuthRequired,
    #[error("Admin privileges required")]
    Forbidden,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            code,
            message: message.into(),
        }
    }

    fn from_kind(kind: ErrorKind, code: &'static str, message: String) -> Self {
        match kind {
            ErrorKind::Validation => AppError::Validation { code, message },
            ErrorKind::StateConflict => AppError::StateConflict { code, message },
            ErrorKind::NotFound => AppError::NotFound { code, message },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { code, .. }
            | AppError::StateConflict { code, .. }
            | AppError::NotFound { code, .. } => code,
            AppError::AuthRequired => "AUTH_REQUIRED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::StateConflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::AuthRequired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Ledger(e) => AppError::from_kind(e.kind(), e.code(), e.to_string()),
            ServiceError::Auction(e) => AppError::from_kind(e.kind(), e.code(), e.to_string()),
            ServiceError::NotFound(what) => AppError::NotFound {
                code: "NOT_FOUND",
                message: format!("{} not found", what),
            },
            ServiceError::Conflict(what) => AppError::StateConflict {
                code: "CONCURRENT_MODIFICATION",
                message: format!("{} was modified concurrently, please retry", what),
            },
            ServiceError::Db(e) => e.into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        error!(error = %err, "Database error");
        AppError::Internal(err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        error!(error = %err, "Session lookup failed");
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("INVALID_BODY", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("INVALID_PATH", rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AmountError, AuctionError, LedgerError};

    #[test]
    fn test_engine_errors_map_by_kind() {
        let err: AppError = ServiceError::Ledger(LedgerError::AlreadyClaimed(2)).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "ALREADY_CLAIMED");

        let err: AppError = ServiceError::Ledger(LedgerError::MissingBankInfo("bankName")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError = ServiceError::Auction(AuctionError::AuctionEnded).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: AppError = ServiceError::Auction(AuctionError::Amount(AmountError::TooPrecise {
            scale: 2,
        }))
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_AMOUNT_PRECISION");

        let err: AppError = ServiceError::Ledger(LedgerError::OrderRefTaken("ord-1".to_string())).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: AppError = ServiceError::NotFound("auction 3".to_string()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_exhausted_retries_surface_as_conflict() {
        let err: AppError = ServiceError::Conflict("auction 1".to_string()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CONCURRENT_MODIFICATION");
    }

    #[test]
    fn test_auth_required_code() {
        assert_eq!(AppError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AuthRequired.code(), "AUTH_REQUIRED");
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }
}
