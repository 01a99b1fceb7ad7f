// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Checkpoint locations and stamp-card layouts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Checkpoint identifier (stamp number on the card).
pub type LocationId = u32;

/// Stamp-card variant identifier.
pub type CardId = u32;

/// A physical checkpoint of the rally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    /// Receiver expected to detect a badge at this checkpoint
    pub receiver_id: String,
    /// Text that selects this location's hint
    pub keyword: String,
    pub title: String,
    pub hint: String,
    pub image_url: String,
}

/// Tappable rectangle on an imagemap, in base-size coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Placement of one checkpoint on a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCheckpoint {
    pub location_id: LocationId,
    pub area: TapArea,
}

/// A stamp-card variant: the ordered checkpoints a user must collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampCard {
    /// Base URL for card and stamp images
    pub base_url: String,
    /// Tap text shown on a completed card
    pub complete_message: String,
    /// Tap area covering the whole completed card
    pub area: TapArea,
    pub checkpoints: Vec<CardCheckpoint>,
}

impl StampCard {
    /// Whether `location_id` is one of this card's checkpoints.
    pub fn contains(&self, location_id: LocationId) -> bool {
        self.checkpoints.iter().any(|c| c.location_id == location_id)
    }

    /// Encode collected stamps as one `0`/`1` per checkpoint, in card order.
    pub fn stamp_mask(&self, stamps: &BTreeSet<LocationId>) -> String {
        self.checkpoints
            .iter()
            .map(|c| if stamps.contains(&c.location_id) { '1' } else { '0' })
            .collect()
    }

    /// Image URL of the card showing the given progress.
    pub fn card_image_url(&self, card_id: CardId, stamps: &BTreeSet<LocationId>) -> String {
        format!("{}/{}/{}", self.base_url, card_id, self.stamp_mask(stamps))
    }

    /// Image URL of a single stamp.
    pub fn stamp_image_url(&self, card_id: CardId, location_id: LocationId) -> String {
        format!("{}/{}/stamp_{}.png", self.base_url, card_id, location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> StampCard {
        let area = TapArea {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        StampCard {
            base_url: "https://cdn.example.com/cards".to_string(),
            complete_message: "done".to_string(),
            area,
            checkpoints: [3, 1, 2]
                .into_iter()
                .map(|location_id| CardCheckpoint { location_id, area })
                .collect(),
        }
    }

    #[test]
    fn test_stamp_mask_follows_card_order() {
        let stamps: BTreeSet<LocationId> = [1, 3].into_iter().collect();
        assert_eq!(card().stamp_mask(&stamps), "101");
    }

    #[test]
    fn test_stamp_mask_ignores_foreign_ids() {
        let stamps: BTreeSet<LocationId> = [9].into_iter().collect();
        assert_eq!(card().stamp_mask(&stamps), "000");
    }

    #[test]
    fn test_image_urls() {
        let card = card();
        let stamps: BTreeSet<LocationId> = [2].into_iter().collect();
        assert_eq!(
            card.card_image_url(7, &stamps),
            "https://cdn.example.com/cards/7/001"
        );
        assert_eq!(
            card.stamp_image_url(7, 2),
            "https://cdn.example.com/cards/7/stamp_2.png"
        );
    }

    #[test]
    fn test_contains() {
        assert!(card().contains(1));
        assert!(!card().contains(4));
    }
}
