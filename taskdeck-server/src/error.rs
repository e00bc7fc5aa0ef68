//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Already exists")]
    Conflict,

    #[error("Expired")]
    Expired,

    #[error("Code already used")]
    AlreadyUsed,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Invitation is no longer pending")]
    NoLongerPending,

    #[error("Invalid or expired invitation")]
    InvalidOrExpired,

    #[error("Already a member of this workspace")]
    AlreadyMember,

    #[error("The workspace owner cannot be removed")]
    CannotRemoveOwner,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<taskdeck_core::Error> for ApiError {
    fn from(err: taskdeck_core::Error) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            ApiError::Conflict => (StatusCode::CONFLICT, "Already exists"),
            ApiError::Expired => (StatusCode::GONE, "Expired"),
            ApiError::AlreadyUsed => (StatusCode::CONFLICT, "Code already used"),
            ApiError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, "Too many attempts"),
            ApiError::NoLongerPending => {
                (StatusCode::CONFLICT, "Invitation is no longer pending")
            }
            ApiError::InvalidOrExpired => {
                (StatusCode::NOT_FOUND, "Invalid or expired invitation")
            }
            ApiError::AlreadyMember => {
                (StatusCode::CONFLICT, "Already a member of this workspace")
            }
            ApiError::CannotRemoveOwner => {
                (StatusCode::FORBIDDEN, "The workspace owner cannot be removed")
            }
            ApiError::Unauthorized => (StatusCode::FORBIDDEN, "Not authorized"),
            ApiError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            ApiError::DeliveryFailed(reason) => {
                tracing::error!("Email delivery failed: {}", reason);
                (StatusCode::BAD_GATEWAY, "Could not deliver email")
            }
            ApiError::PasswordTooShort => {
                (StatusCode::BAD_REQUEST, "Password too short (minimum 8 characters)")
            }
            ApiError::PasswordTooLong => {
                (StatusCode::BAD_REQUEST, "Password too long (maximum 80 characters)")
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}
