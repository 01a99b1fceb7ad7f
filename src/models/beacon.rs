// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Beacon badges and their proximity detections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link between a user and a beacon badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconAttachment {
    pub beacon_id: String,
    pub user_id: String,
    /// Only attached badges are considered live
    pub attached: bool,
}

/// A beacon sensed by a receiver, written by the upstream detection feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub beacon_id: String,
    /// Native Firestore timestamp; detection queries order by it
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Receiver that sensed the beacon
    pub receiver_id: String,
    /// Display name of the receiver's location
    pub location_name: String,
    pub map_image_url: String,
}
