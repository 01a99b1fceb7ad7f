// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Detection aggregation across a user's attached badges.
//!
//! Each attached beacon's latest detection is looked up concurrently
//! (bounded). Per-beacon outcomes are kept so callers can see partial
//! failures instead of silently losing them.

use crate::db::{AttachmentRepository, DetectionRepository};
use crate::error::{AppError, Result};
use crate::models::Detection;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Outcome of a single beacon lookup.
#[derive(Debug)]
pub struct BeaconLookup {
    pub beacon_id: String,
    pub outcome: Result<Option<Detection>>,
}

/// All beacon lookups for one user, in completion order.
#[derive(Debug, Default)]
pub struct DetectionReport {
    pub lookups: Vec<BeaconLookup>,
}

impl DetectionReport {
    /// Successful lookups that found a detection.
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.lookups
            .iter()
            .filter_map(|l| l.outcome.as_ref().ok().and_then(|d| d.as_ref()))
    }

    /// Failed lookups.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &AppError)> {
        self.lookups.iter().filter_map(|l| match &l.outcome {
            Err(e) => Some((l.beacon_id.as_str(), e)),
            Ok(_) => None,
        })
    }

    /// Collapse into the usable detections.
    ///
    /// Failed lookups are logged and skipped. If every lookup failed, the
    /// first failure is returned instead.
    pub fn into_detections(self) -> Result<Vec<Detection>> {
        let total = self.lookups.len();
        let mut detections = Vec::new();
        let mut first_error = None;
        let mut failed = 0;

        for lookup in self.lookups {
            match lookup.outcome {
                Ok(Some(detection)) => detections.push(detection),
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        beacon_id = %lookup.beacon_id,
                        error = %e,
                        "Detection lookup failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if failed == total => Err(e),
            _ => Ok(detections),
        }
    }
}

/// Gathers recent detections for a user's attached badges.
#[derive(Clone)]
pub struct DetectionAggregator {
    attachments: Arc<dyn AttachmentRepository>,
    detections: Arc<dyn DetectionRepository>,
}

impl DetectionAggregator {
    pub fn new(
        attachments: Arc<dyn AttachmentRepository>,
        detections: Arc<dyn DetectionRepository>,
    ) -> Self {
        Self {
            attachments,
            detections,
        }
    }

    /// Look up the latest detection of every badge attached to `user_id`.
    ///
    /// Returns [`AppError::NoBadge`] when the user has no attached badge,
    /// regardless of any detections left over from earlier attachments.
    pub async fn recent_detections(&self, user_id: &str) -> Result<DetectionReport> {
        let attached = self.attachments.list_attached(user_id).await?;
        if attached.is_empty() {
            return Err(AppError::NoBadge {
                user_id: user_id.to_string(),
            });
        }

        let repo = &self.detections;
        let lookups = stream::iter(attached)
            .map(|attachment| async move {
                let outcome = repo
                    .latest_detections(&attachment.beacon_id, 1)
                    .await
                    .map(|mut found| {
                        if found.is_empty() {
                            None
                        } else {
                            Some(found.swap_remove(0))
                        }
                    });
                BeaconLookup {
                    beacon_id: attachment.beacon_id,
                    outcome,
                }
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<BeaconLookup>>()
            .await;

        tracing::debug!(
            user_id,
            beacons = lookups.len(),
            found = lookups
                .iter()
                .filter(|l| matches!(l.outcome, Ok(Some(_))))
                .count(),
            "Collected beacon detections"
        );

        Ok(DetectionReport { lookups })
    }
}
