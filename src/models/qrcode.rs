// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user QR codes shown at the reception desk to pair a badge.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A user's QR code. One per user, issued on first request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrCode {
    pub user_id: String,
    /// Opaque code embedded in the QR image
    pub code_id: String,
    pub created_at: String,
}

impl QrCode {
    /// Issue a new code for `user_id`.
    ///
    /// The code is derived from the user ID and issue time, so it cannot be
    /// guessed from the user ID alone.
    pub fn issue(user_id: &str, now: DateTime<Utc>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        let digest = hasher.finalize();

        Self {
            user_id: user_id.to_string(),
            code_id: URL_SAFE_NO_PAD.encode(&digest[..16]),
            created_at: crate::time_utils::format_utc_rfc3339(now),
        }
    }

    /// URL of the rendered QR image.
    pub fn image_url(&self, image_base_url: &str) -> String {
        format!("{}{}", image_base_url, self.code_id)
    }
}
