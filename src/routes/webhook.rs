// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for LINE Messaging API events.

use crate::error::AppError;
use crate::middleware::require_signature;
use crate::models::{WebhookEvent, WebhookPayload};
use crate::AppState;
use axum::{
    body::Bytes, extract::State, http::StatusCode, middleware, routing::post, Router,
};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Webhook routes. Every request must carry a valid channel signature.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route_layer(middleware::from_fn_with_state(state, require_signature))
}

/// Counters for webhook events. Failures are answered with 200 so the
/// platform does not redeliver, and counted here instead.
#[derive(Debug, Default)]
pub struct WebhookStats {
    handled: AtomicU64,
    suppressed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WebhookStatsSnapshot {
    pub handled: u64,
    pub suppressed: u64,
}

impl WebhookStats {
    pub fn snapshot(&self) -> WebhookStatsSnapshot {
        WebhookStatsSnapshot {
            handled: self.handled.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }

    fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle a signed webhook delivery (POST).
async fn handle_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse webhook payload");
            return StatusCode::OK; // Still return 200 to avoid redelivery
        }
    };

    tracing::info!(
        destination = payload.destination.as_deref().unwrap_or(""),
        events = payload.events.len(),
        "Webhook received"
    );

    let outcomes = join_all(
        payload
            .events
            .iter()
            .map(|event| handle_one(&state, event)),
    )
    .await;

    for (index, (event, outcome)) in payload.events.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(()) => state.webhook_stats.record_handled(),
            Err(e) => {
                state.webhook_stats.record_suppressed();
                tracing::error!(
                    event_index = index,
                    event_type = event.kind(),
                    user_id = event
                        .source()
                        .and_then(|s| s.user_id.as_deref())
                        .unwrap_or(""),
                    error = %e,
                    "Suppressed webhook event failure"
                );
            }
        }
    }

    StatusCode::OK
}

/// Handle one event under the per-event deadline.
async fn handle_one(state: &AppState, event: &WebhookEvent) -> Result<(), AppError> {
    let deadline = state.config.event_timeout;
    match tokio::time::timeout(deadline, state.rally.handle_event(event)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} event exceeded {:?}",
            event.kind(),
            deadline
        ))),
    }
}
