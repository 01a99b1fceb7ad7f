// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in validation.
//!
//! Decides whether a claimed checkpoint visit is backed by a recent
//! detection. The decision order is fixed:
//! 1. already stamped → [`Verdict::AlreadyCollected`] (even when forced)
//! 2. forced → [`Verdict::Accepted`]
//! 3. any fresh detection at the checkpoint's receiver → accepted, else rejected

use crate::models::{Detection, Location, User};
use crate::services::recency::RecencyPolicy;
use chrono::{DateTime, Utc};

/// Outcome of a check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AlreadyCollected,
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::AlreadyCollected => "already_collected",
            Verdict::Accepted => "accepted",
            Verdict::Rejected => "rejected",
        }
    }
}

/// Validate a check-in against the user's recent detections.
///
/// Any qualifying detection is enough; it need not be the most recent one.
pub fn validate(
    user: &User,
    checkpoint: &Location,
    detections: &[Detection],
    force: bool,
    policy: RecencyPolicy,
    now: DateTime<Utc>,
) -> Verdict {
    if user.has_stamp(checkpoint.id) {
        return Verdict::AlreadyCollected;
    }
    if force {
        return Verdict::Accepted;
    }

    let qualifying = detections.iter().any(|d| {
        if d.receiver_id != checkpoint.receiver_id {
            tracing::debug!(
                expected = %checkpoint.receiver_id,
                detected = %d.receiver_id,
                beacon_id = %d.beacon_id,
                "Receiver mismatch"
            );
            return false;
        }
        if !policy.is_fresh(d.timestamp, now) {
            tracing::debug!(
                beacon_id = %d.beacon_id,
                detected_at = %d.timestamp,
                threshold_minutes = policy.threshold_minutes,
                "Detection too old"
            );
            return false;
        }
        true
    });

    if qualifying {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}
