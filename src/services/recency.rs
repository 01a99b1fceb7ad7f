// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Detection recency policy.

use chrono::{DateTime, Utc};

/// Whether a detection is recent enough to back a check-in.
///
/// Elapsed time is counted in whole minutes (truncated) and compared
/// inclusively: a detection exactly `threshold_minutes` old is fresh.
pub fn is_fresh(detected_at: DateTime<Utc>, now: DateTime<Utc>, threshold_minutes: i64) -> bool {
    (now - detected_at).num_minutes() <= threshold_minutes
}

/// Recency threshold taken from the rally settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyPolicy {
    pub threshold_minutes: i64,
}

impl RecencyPolicy {
    pub fn new(threshold_minutes: i64) -> Self {
        Self { threshold_minutes }
    }

    pub fn is_fresh(&self, detected_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_fresh(detected_at, now, self.threshold_minutes)
    }
}
