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
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The user has no live beacon attachment.
    #[error("No beacon badge attached to user {user_id}")]
    NoBadge { user_id: String },

    /// Rally configuration lookup miss (unknown checkpoint, unknown card).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Messaging API error: {0}")]
    Messaging(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error should be answered with a user-visible reply
    /// rather than dropped.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::NoBadge { .. } | AppError::Configuration(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NoBadge { user_id } => (
                StatusCode::NOT_FOUND,
                "no_badge",
                Some(format!("user {}", user_id)),
            ),
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", None)
            }
            AppError::Messaging(msg) => {
                (StatusCode::BAD_GATEWAY, "messaging_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Timeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "timeout", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
