// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rally configuration: checkpoint locations, stamp cards, keywords and
//! reply texts.
//!
//! Loaded once at startup and validated so that lookups by the rally flows
//! only miss on user-supplied ids, never on dangling config references.

use crate::error::AppError;
use crate::models::location::{CardId, Location, LocationId, StampCard};
use crate::services::dispatch::KeywordAction;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Game-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RallySettings {
    /// Card assigned on enrollment
    pub card_id: CardId,
    /// Maximum detection age for a check-in, in minutes
    pub checkin_time_threshold: i64,
}

/// Keyword entry: any of `keywords` appearing in a message triggers `action`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub action: KeywordAction,
}

/// User-visible reply texts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RallyMessages {
    pub default: String,
    pub complete: String,
    pub request_enquete: String,
    pub no_location_log: String,
    pub last_location: String,
    pub badge_not_registered: String,
    pub badge_required: String,
    pub enrolled: String,
    pub already_enrolled: String,
    pub not_enrolled: String,
    pub stamp_awarded: String,
    pub already_collected: String,
    pub checkin_rejected: String,
    pub card_hint: String,
    pub hint_prompt: String,
    pub checkin_button: String,
    pub unavailable: String,
    pub enquete_thanks: String,
    pub qrcode_title: String,
    pub qrcode_text: String,
    pub qrcode_button: String,
    pub terms_not_accepted: String,
}

impl Default for RallyMessages {
    fn default() -> Self {
        Self {
            default: "Tap the menu below to play the stamp rally!".to_string(),
            complete: "Congratulations! You collected every stamp!".to_string(),
            request_enquete: "Please tell us what you thought in our short survey.".to_string(),
            no_location_log: "No location has been logged for your badge yet.".to_string(),
            last_location: "You were near {location} {elapsed}.".to_string(),
            badge_not_registered: "Your badge is not registered.".to_string(),
            badge_required:
                "Your badge is not registered.\nPick one up at the reception desk.".to_string(),
            enrolled: "Open the stamp card from the menu to see your progress.".to_string(),
            already_enrolled: "You are already playing. Keep collecting stamps!".to_string(),
            not_enrolled: "Start the stamp rally from the menu first.".to_string(),
            stamp_awarded: "You got stamp #{id}!".to_string(),
            already_collected: "You already have this stamp.".to_string(),
            checkin_rejected: "Sorry! We could not find you at this checkpoint.".to_string(),
            card_hint: "Pick a number to see a hint for where the next stamp is hidden."
                .to_string(),
            hint_prompt: "Pick a number to see a hint!".to_string(),
            checkin_button: "Get stamp".to_string(),
            unavailable: "Sorry, this is not available right now.".to_string(),
            enquete_thanks: "Thank you for taking our survey!".to_string(),
            qrcode_title: "Your QR code".to_string(),
            qrcode_text: "Show this at reception to get your badge.".to_string(),
            qrcode_button: "Start the rally".to_string(),
            terms_not_accepted:
                "We can't register you until you accept the terms of use of this account."
                    .to_string(),
        }
    }
}

/// Raw rally config file.
#[derive(Debug, Deserialize)]
struct RallyConfig {
    settings: RallySettings,
    locations: Vec<Location>,
    stamp_cards: HashMap<CardId, StampCard>,
    #[serde(default)]
    keywords: Vec<KeywordRule>,
    #[serde(default)]
    map_url: Option<String>,
    /// Prefix of rendered QR code images; the code ID is appended
    #[serde(default)]
    qr_image_base_url: Option<String>,
    #[serde(default)]
    messages: RallyMessages,
}

/// Read-only directory of locations and cards.
#[derive(Debug, Clone)]
pub struct LocationDirectory {
    settings: RallySettings,
    locations: Vec<Location>,
    cards: HashMap<CardId, StampCard>,
    keywords: Vec<KeywordRule>,
    map_url: Option<String>,
    qr_image_base_url: Option<String>,
    messages: RallyMessages,
}

impl LocationDirectory {
    /// Load the rally config from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let json_data = fs::read_to_string(path.as_ref())
            .map_err(|e| DirectoryError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the rally config from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, DirectoryError> {
        let config: RallyConfig = serde_json::from_str(json_data)
            .map_err(|e| DirectoryError::ParseError(e.to_string()))?;

        if config.settings.checkin_time_threshold < 0 {
            return Err(DirectoryError::Invalid(format!(
                "checkin_time_threshold must not be negative (got {})",
                config.settings.checkin_time_threshold
            )));
        }

        let mut ids = HashSet::new();
        let mut keywords = HashSet::new();
        for location in &config.locations {
            if !ids.insert(location.id) {
                return Err(DirectoryError::Invalid(format!(
                    "duplicate location id {}",
                    location.id
                )));
            }
            if location.keyword.is_empty() || !keywords.insert(location.keyword.as_str()) {
                return Err(DirectoryError::Invalid(format!(
                    "location {} needs a unique, non-empty keyword",
                    location.id
                )));
            }
        }

        for (card_id, card) in &config.stamp_cards {
            if card.checkpoints.is_empty() {
                return Err(DirectoryError::Invalid(format!(
                    "card {} has no checkpoints",
                    card_id
                )));
            }
            let mut seen = HashSet::new();
            for checkpoint in &card.checkpoints {
                if !ids.contains(&checkpoint.location_id) {
                    return Err(DirectoryError::UnknownLocation {
                        card_id: *card_id,
                        location_id: checkpoint.location_id,
                    });
                }
                if !seen.insert(checkpoint.location_id) {
                    return Err(DirectoryError::Invalid(format!(
                        "card {} lists location {} twice",
                        card_id, checkpoint.location_id
                    )));
                }
            }
        }

        if !config.stamp_cards.contains_key(&config.settings.card_id) {
            return Err(DirectoryError::UnknownCard(config.settings.card_id));
        }

        tracing::info!(
            locations = config.locations.len(),
            cards = config.stamp_cards.len(),
            keyword_rules = config.keywords.len(),
            "Loaded rally config"
        );

        Ok(Self {
            settings: config.settings,
            locations: config.locations,
            cards: config.stamp_cards,
            keywords: config.keywords,
            map_url: config.map_url,
            qr_image_base_url: config.qr_image_base_url,
            messages: config.messages,
        })
    }

    pub fn settings(&self) -> &RallySettings {
        &self.settings
    }

    pub fn messages(&self) -> &RallyMessages {
        &self.messages
    }

    pub fn keyword_rules(&self) -> &[KeywordRule] {
        &self.keywords
    }

    pub fn map_url(&self) -> Option<&str> {
        self.map_url.as_deref()
    }

    pub fn qr_image_base_url(&self) -> Result<&str, AppError> {
        self.qr_image_base_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("qr_image_base_url is not set".to_string()))
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Look up a checkpoint by ID.
    pub fn by_id(&self, location_id: LocationId) -> Result<&Location, AppError> {
        self.locations
            .iter()
            .find(|l| l.id == location_id)
            .ok_or_else(|| AppError::Configuration(format!("unknown location {}", location_id)))
    }

    /// First location whose keyword occurs in `text`.
    pub fn by_keyword(&self, text: &str) -> Option<&Location> {
        self.locations.iter().find(|l| text.contains(&l.keyword))
    }

    /// Look up a stamp card by ID.
    pub fn card(&self, card_id: CardId) -> Result<&StampCard, AppError> {
        self.cards
            .get(&card_id)
            .ok_or_else(|| AppError::Configuration(format!("unknown stamp card {}", card_id)))
    }
}

/// Errors from loading the rally config.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse rally config: {0}")]
    ParseError(String),

    #[error("Card {card_id} references unknown location {location_id}")]
    UnknownLocation {
        card_id: CardId,
        location_id: LocationId,
    },

    #[error("Default card {0} is not defined")]
    UnknownCard(CardId),

    #[error("Invalid rally config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> serde_json::Value {
        let area = json!({"x": 0, "y": 0, "width": 520, "height": 520});
        json!({
            "settings": {"card_id": 1, "checkin_time_threshold": 30},
            "locations": [
                {"id": 1, "receiver_id": "R1", "keyword": "hint 1", "title": "One",
                 "hint": "h1", "image_url": "https://x/1.png"},
                {"id": 2, "receiver_id": "R2", "keyword": "hint 2", "title": "Two",
                 "hint": "h2", "image_url": "https://x/2.png"}
            ],
            "stamp_cards": {
                "1": {
                    "base_url": "https://x/cards",
                    "complete_message": "all done",
                    "area": area,
                    "checkpoints": [
                        {"location_id": 1, "area": area},
                        {"location_id": 2, "area": area}
                    ]
                }
            },
            "keywords": [
                {"keywords": ["where"], "action": "last_location"},
                {"keywords": ["card"], "action": "stamp_card"}
            ],
            "qr_image_base_url": "https://qr.test/",
            "messages": {"default": "hello"}
        })
    }

    fn load(value: serde_json::Value) -> Result<LocationDirectory, DirectoryError> {
        LocationDirectory::load_from_json(&value.to_string())
    }

    #[test]
    fn test_load_valid_config() {
        let dir = load(config()).unwrap();
        assert_eq!(dir.settings().checkin_time_threshold, 30);
        assert_eq!(dir.by_id(2).unwrap().receiver_id, "R2");
        assert_eq!(dir.card(1).unwrap().checkpoints.len(), 2);
        assert_eq!(dir.keyword_rules().len(), 2);
        // Overridden text and defaulted text
        assert_eq!(dir.messages().default, "hello");
        assert!(!dir.messages().complete.is_empty());
    }

    #[test]
    fn test_lookup_misses_are_configuration_errors() {
        let dir = load(config()).unwrap();
        assert!(matches!(dir.by_id(99), Err(AppError::Configuration(_))));
        assert!(matches!(dir.card(99), Err(AppError::Configuration(_))));
        assert_eq!(dir.qr_image_base_url().unwrap(), "https://qr.test/");

        let mut value = config();
        value.as_object_mut().unwrap().remove("qr_image_base_url");
        let dir = load(value).unwrap();
        assert!(matches!(
            dir.qr_image_base_url(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_qr_keyword_action_accepted() {
        let mut value = config();
        value["keywords"][0]["action"] = json!("show_qr_code");
        let dir = load(value).unwrap();
        assert_eq!(dir.keyword_rules()[0].action, KeywordAction::ShowQrCode);
    }

    #[test]
    fn test_by_keyword_substring() {
        let dir = load(config()).unwrap();
        assert_eq!(dir.by_keyword("show me hint 2 please").unwrap().id, 2);
        assert!(dir.by_keyword("nothing").is_none());
    }

    #[test]
    fn test_unknown_keyword_action_rejected() {
        let mut value = config();
        value["keywords"][0]["action"] = json!("sendCoupon");
        assert!(matches!(load(value), Err(DirectoryError::ParseError(_))));
    }

    #[test]
    fn test_card_with_unknown_location_rejected() {
        let mut value = config();
        value["stamp_cards"]["1"]["checkpoints"][1]["location_id"] = json!(7);
        assert!(matches!(
            load(value),
            Err(DirectoryError::UnknownLocation {
                card_id: 1,
                location_id: 7
            })
        ));
    }

    #[test]
    fn test_missing_default_card_rejected() {
        let mut value = config();
        value["settings"]["card_id"] = json!(5);
        assert!(matches!(load(value), Err(DirectoryError::UnknownCard(5))));
    }

    #[test]
    fn test_duplicate_keyword_rejected() {
        let mut value = config();
        value["locations"][1]["keyword"] = json!("hint 1");
        assert!(matches!(load(value), Err(DirectoryError::Invalid(_))));
    }

    #[test]
    fn test_bundled_config_loads() {
        let dir = LocationDirectory::load_from_file("data/stamp_rally.json")
            .expect("Failed to load bundled rally config - is data/ committed?");
        assert!(!dir.locations().is_empty());
    }
}
