use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::bitrix::BitrixError;

/// Why a session could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    Missing,
    Invalid,
    Expired,
}

impl AuthFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailureReason::Missing => "missing",
            AuthFailureReason::Invalid => "invalid",
            AuthFailureReason::Expired => "expired",
        }
    }
}

impl std::fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("session {0}")]
    Unauthorized(AuthFailureReason),
    #[error("bitrix credentials missing")]
    CredentialsMissing,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("bitrix error: {0}")]
    Bitrix(#[from] BitrixError),
    #[error("{0}")]
    Internal(String),
}

impl From<AuthFailureReason> for AppError {
    fn from(reason: AuthFailureReason) -> Self {
        AppError::Unauthorized(reason)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    error_message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::CredentialsMissing => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Bitrix(BitrixError::InvalidDomain(_)) => StatusCode::BAD_REQUEST,
            AppError::Bitrix(BitrixError::Api { .. } | BitrixError::Http(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Bitrix(BitrixError::NotConfigured)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> Option<&'static str> {
        match self {
            AppError::Unauthorized(reason) => Some(reason.as_str()),
            AppError::CredentialsMissing => Some("credentials_missing"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Never leak driver details to the client.
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            reason: self.reason(),
            error_message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_401_with_reason() {
        let err = AppError::Unauthorized(AuthFailureReason::Expired);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.reason(), Some("expired"));

        let err = AppError::CredentialsMissing;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.reason(), Some("credentials_missing"));
    }

    #[test]
    fn not_found_has_no_reason() {
        let err = AppError::NotFound("company");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.reason(), None);
        assert_eq!(err.to_string(), "company not found");
    }
}
