// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rally participant and their stamp collection.
//!
//! Progress is `NOT_ENROLLED` (no record) → partial → complete. Completion is
//! always derived from the stamp set and the card, never stored.

use crate::models::location::{CardId, LocationId, StampCard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Enrolled participant stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Platform user ID (also used as document ID)
    pub user_id: String,
    /// Stamp-card variant the user joined
    pub card_id: CardId,
    /// Collected checkpoints
    #[serde(default)]
    pub stamps: BTreeSet<LocationId>,
    /// Whether the post-completion survey has been offered
    #[serde(default)]
    pub send_enquete: bool,
    /// When the user enrolled (ISO 8601)
    pub created_at: String,
    /// Last stamp or flag change (ISO 8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Derived progress of a user against their card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampProgress {
    Partial { collected: usize, total: usize },
    Complete,
}

impl User {
    /// Create a freshly enrolled user with an empty stamp set.
    pub fn enroll(user_id: &str, card_id: CardId, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            card_id,
            stamps: BTreeSet::new(),
            send_enquete: false,
            created_at: now.to_string(),
            updated_at: None,
        }
    }

    pub fn has_stamp(&self, location_id: LocationId) -> bool {
        self.stamps.contains(&location_id)
    }

    /// Add a stamp. Returns `false` (and changes nothing) if it was already
    /// collected.
    ///
    /// The caller is expected to have validated the check-in first; this
    /// only guards against duplicate insertion.
    pub fn award_stamp(&mut self, location_id: LocationId, now: &str) -> bool {
        if !self.stamps.insert(location_id) {
            return false;
        }
        self.updated_at = Some(now.to_string());
        true
    }

    pub fn progress(&self, card: &StampCard) -> StampProgress {
        let total = card.checkpoints.len();
        let collected = self.stamps.len();
        if collected == total {
            StampProgress::Complete
        } else {
            StampProgress::Partial { collected, total }
        }
    }

    pub fn is_complete(&self, card: &StampCard) -> bool {
        self.progress(card) == StampProgress::Complete
    }

    /// Claim the one-shot survey offer. Returns `true` the first time only.
    pub fn take_survey_offer(&mut self, now: &str) -> bool {
        if self.send_enquete {
            return false;
        }
        self.send_enquete = true;
        self.updated_at = Some(now.to_string());
        true
    }
}
