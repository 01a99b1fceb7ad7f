// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook signature verification.
//!
//! LINE signs each webhook body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in `X-Line-Signature`.

use crate::error::AppError;
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Webhook bodies larger than this are rejected before verification.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Compute the base64 signature of `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature` (base64) against the HMAC of `body`.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(provided) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided.as_slice()).into()
}

/// Reject webhook requests without a valid signature.
pub async fn require_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let Some(signature) = signature else {
        tracing::warn!("Security Alert: Webhook request without signature");
        return AppError::InvalidSignature.into_response();
    };

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read webhook body");
            return AppError::BadRequest("unreadable body".to_string()).into_response();
        }
    };

    if !verify_signature(state.config.channel_secret.as_bytes(), &bytes, &signature) {
        tracing::warn!("Security Alert: Webhook signature mismatch");
        return AppError::InvalidSignature.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let secret = b"channel_secret";
        let body = br#"{"events":[]}"#;
        let signature = sign(secret, body).unwrap();
        assert!(verify_signature(secret, body, &signature));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let secret = b"channel_secret";
        let signature = sign(secret, br#"{"events":[]}"#).unwrap();
        assert!(!verify_signature(secret, br#"{"events":[1]}"#, &signature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"events":[]}"#;
        let signature = sign(b"other_secret", body).unwrap();
        assert!(!verify_signature(b"channel_secret", body, &signature));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        assert!(!verify_signature(b"secret", b"body", "not base64!!"));
        assert!(!verify_signature(b"secret", b"body", ""));
    }
}
