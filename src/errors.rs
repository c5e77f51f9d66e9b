use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Message shown to callers when the policy evaluator denies a record
/// operation. The specific rule stays in the server log.
pub const NOT_PERMITTED: &str = "not permitted";

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Generic denial used at the record boundary.
    pub fn not_permitted() -> Self {
        Self::PermissionDenied(NOT_PERMITTED.to_string())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable error kind shown by the administration UI.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) | AppError::Token(_) => "unauthenticated",
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::PermissionDenied(_) => "permission-denied",
            AppError::FailedPrecondition(_) => "failed-precondition",
            AppError::NotFound(_) => "not-found",
            AppError::Conflict(_) => "already-exists",
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Message without the kind prefix, suitable for the audit log.
    pub fn detail(&self) -> String {
        match self {
            AppError::Unauthenticated(m)
            | AppError::InvalidArgument(m)
            | AppError::PermissionDenied(m)
            | AppError::FailedPrecondition(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::Configuration(m)
            | AppError::Token(m)
            | AppError::Internal(m) => m.clone(),
            AppError::Database(err) => err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AppError::Database(err) = &self {
            tracing::error!(error = %err, "database error");
        }

        // Database details never leave the process.
        let message = match &self {
            AppError::Database(_) => "internal error".to_string(),
            other => other.detail(),
        };

        let payload = ErrorResponse {
            error: self.code(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_admin_taxonomy() {
        assert_eq!(AppError::unauthenticated("x").code(), "unauthenticated");
        assert_eq!(AppError::token("expired").code(), "unauthenticated");
        assert_eq!(AppError::invalid_argument("x").code(), "invalid-argument");
        assert_eq!(AppError::permission_denied("x").code(), "permission-denied");
        assert_eq!(AppError::failed_precondition("x").code(), "failed-precondition");
        assert_eq!(AppError::not_found("x").code(), "not-found");
        assert_eq!(AppError::internal("x").code(), "internal");
    }

    #[test]
    fn precondition_failures_map_to_412() {
        let resp = AppError::failed_precondition("cannot demote the last admin").into_response();
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn not_permitted_is_generic() {
        assert_eq!(AppError::not_permitted().detail(), NOT_PERMITTED);
    }
}
