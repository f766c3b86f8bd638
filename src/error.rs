use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::recovery::InvalidOrExpired;
use crate::matcher::MatchError;

/// Every failure a handler can surface. Each variant carries a stable
/// machine-readable reason; internal detail stays in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("User not found.")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Face not recognized")]
    NotRecognized,
    #[error("Invalid or expired OTP.")]
    InvalidOrExpired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Conflict(_) => "conflict",
            ApiError::UserNotFound => "user_not_found",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::NotRecognized => "face_not_recognized",
            ApiError::InvalidOrExpired => "invalid_or_expired_otp",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidOrExpired => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials | ApiError::NotRecognized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<InvalidOrExpired> for ApiError {
    fn from(_: InvalidOrExpired) -> Self {
        ApiError::InvalidOrExpired
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // store/notifier detail must not reach the client
            ApiError::Internal(err) => {
                error!(error = %err, "internal error");
                "Server error.".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message, "reason": self.reason() }));
        (self.status(), body).into_response()
    }
}
