// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maps webhook events to rally actions.
//!
//! Keyword rules come from the rally config but their actions are members of
//! [`KeywordAction`], so an unknown action name fails config loading rather
//! than a lookup at request time.

use crate::models::event::{EventMessage, EventSource, WebhookEvent};
use crate::models::LocationId;
use crate::services::directory::KeywordRule;
use serde::Deserialize;

/// Actions a keyword rule may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordAction {
    LastLocation,
    StampCard,
    LocationHint,
    ShowMap,
    ShowQrCode,
}

/// Everything the rally can do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// (Re-)follow: reset the user and show the join menu
    Follow,
    /// Group join: nothing to do
    Join,
    StartRally,
    CheckIn { location_id: LocationId, force: bool },
    AcknowledgeSurvey,
    LastLocation,
    StampCard,
    LocationHint { text: String },
    ShowMap,
    /// Reply with the user's pairing QR code and a start button
    ShowQrCode,
    /// QR code requested from a source without a user ID
    RequireConsent,
    DefaultReply,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Follow => "follow",
            Action::Join => "join",
            Action::StartRally => "start_rally",
            Action::CheckIn { .. } => "check_in",
            Action::AcknowledgeSurvey => "acknowledge_survey",
            Action::LastLocation => "last_location",
            Action::StampCard => "stamp_card",
            Action::LocationHint { .. } => "location_hint",
            Action::ShowMap => "show_map",
            Action::ShowQrCode => "show_qr_code",
            Action::RequireConsent => "require_consent",
            Action::DefaultReply => "default_reply",
        }
    }
}

/// An action bound to the event it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEvent {
    /// Empty only for [`Action::RequireConsent`]
    pub user_id: String,
    pub reply_token: Option<String>,
    pub action: Action,
}

/// Parsed `action=...&key=value` postback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackAction {
    Start,
    CheckIn { location_id: LocationId, force: bool },
    Enquete,
}

impl PostbackAction {
    /// Parse postback data. Returns `None` for unknown or malformed data.
    pub fn parse(data: &str) -> Option<Self> {
        let mut action = None;
        let mut location_id = None;
        let mut force = false;

        for pair in data.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value).ok()?;
            match key {
                "action" => action = Some(value.into_owned()),
                "locationId" => location_id = Some(value.trim().parse::<LocationId>().ok()?),
                "force" => force = !value.is_empty() && value != "0",
                _ => {}
            }
        }

        match action.as_deref()? {
            "start" => Some(PostbackAction::Start),
            "checkin" => Some(PostbackAction::CheckIn {
                location_id: location_id?,
                force,
            }),
            "enquete" => Some(PostbackAction::Enquete),
            _ => None,
        }
    }
}

/// Keyword table built once from the rally config.
#[derive(Debug, Clone)]
pub struct EventRouter {
    rules: Vec<KeywordRule>,
}

impl EventRouter {
    pub fn new(rules: &[KeywordRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    /// First rule with a keyword contained in `text`.
    pub fn keyword_action(&self, text: &str) -> Option<KeywordAction> {
        self.rules
            .iter()
            .find(|r| r.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|r| r.action)
    }

    /// Resolve an event to an action. `None` means the event is ignored.
    pub fn route(&self, event: &WebhookEvent) -> Option<RoutedEvent> {
        let source = event.source()?;

        let (reply_token, action) = match event {
            WebhookEvent::Message(e) => {
                let action = match &e.message {
                    EventMessage::Text { text } => match self.keyword_action(text) {
                        Some(action) => Some(keyword_to_action(action, text)),
                        None => default_reply(source),
                    },
                    EventMessage::Other => default_reply(source),
                }?;
                (Some(e.reply_token.clone()), action)
            }
            WebhookEvent::Follow(e) => (e.reply_token.clone(), Action::Follow),
            WebhookEvent::Join(e) => (e.reply_token.clone(), Action::Join),
            WebhookEvent::Postback(e) => {
                let action = match PostbackAction::parse(&e.postback.data) {
                    Some(PostbackAction::Start) => Action::StartRally,
                    Some(PostbackAction::CheckIn { location_id, force }) => {
                        Action::CheckIn { location_id, force }
                    }
                    Some(PostbackAction::Enquete) => Action::AcknowledgeSurvey,
                    None => {
                        tracing::warn!(data = %e.postback.data, "Unrecognized postback data");
                        return None;
                    }
                };
                (Some(e.reply_token.clone()), action)
            }
            WebhookEvent::Beacon(_) | WebhookEvent::Unsupported => return None,
        };

        match source.user_id.as_deref() {
            Some(id) => Some(RoutedEvent {
                user_id: id.to_string(),
                reply_token,
                action,
            }),
            // No user ID: the terms of use were not accepted
            None if action == Action::ShowQrCode => Some(RoutedEvent {
                user_id: String::new(),
                reply_token,
                action: Action::RequireConsent,
            }),
            None => {
                tracing::debug!(event_type = event.kind(), "Event without user ID ignored");
                None
            }
        }
    }
}

fn keyword_to_action(action: KeywordAction, text: &str) -> Action {
    match action {
        KeywordAction::LastLocation => Action::LastLocation,
        KeywordAction::StampCard => Action::StampCard,
        KeywordAction::LocationHint => Action::LocationHint {
            text: text.to_string(),
        },
        KeywordAction::ShowMap => Action::ShowMap,
        KeywordAction::ShowQrCode => Action::ShowQrCode,
    }
}

/// Unmatched messages get the default reply in 1:1 chats only.
fn default_reply(source: &EventSource) -> Option<Action> {
    source.is_private_talk().then_some(Action::DefaultReply)
}
