// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use stamp_rally::error::AppError;

async fn error_code(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_status_mapping() {
    let (status, body) = error_code(AppError::InvalidSignature).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_signature");

    let (status, body) = error_code(AppError::NoBadge {
        user_id: "U1".to_string(),
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_badge");

    let (status, _) = error_code(AppError::Messaging("down".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = error_code(AppError::Timeout("slow".to_string())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let (status, body) = error_code(AppError::Database("password=hunter2".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());

    let (_, body) = error_code(AppError::Configuration("unknown card 7".to_string())).await;
    assert!(body.get("details").is_none());
}

#[test]
fn test_recoverable_errors() {
    assert!(AppError::NoBadge {
        user_id: "U1".to_string()
    }
    .is_recoverable());
    assert!(AppError::Configuration("x".to_string()).is_recoverable());
    assert!(!AppError::Database("x".to_string()).is_recoverable());
    assert!(!AppError::Messaging("x".to_string()).is_recoverable());
}
