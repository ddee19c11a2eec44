// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(serde_json::Value),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Requested slot overlaps an existing booking: {0}")]
    SlotConflict(String),

    #[error("A sync run is already in progress for this user")]
    SyncInProgress,

    #[error("Google credential expired, reconnect required: {0}")]
    AuthExpired(String),

    #[error("Invalid or expired OAuth session state")]
    InvalidOrExpiredState,

    #[error("Google token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Google API error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error envelope: `{status, message, errors?}`.
#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed".to_string(),
                Some(errors),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::SlotConflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::SyncInProgress => (
                StatusCode::CONFLICT,
                "A sync run is already in progress for this user".to_string(),
                None,
            ),
            AppError::AuthExpired(msg) => (
                StatusCode::FORBIDDEN,
                "Google Calendar connection expired, please reconnect".to_string(),
                Some(serde_json::Value::String(msg)),
            ),
            AppError::InvalidOrExpiredState => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired OAuth session state".to_string(),
                None,
            ),
            AppError::TokenExchangeFailed(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Failed to get access token: {}", msg),
                None,
            ),
            AppError::Provider(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Google API error: {}", msg),
                None,
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
