// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbound webhook payload (LINE Messaging API shapes).

use serde::Deserialize;

/// Body of a webhook request: a batch of events.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    Follow(ReplyableEvent),
    Join(ReplyableEvent),
    Postback(PostbackEvent),
    /// Beacon events are consumed by the upstream detection feed, not here.
    Beacon(ReplyableEvent),
    #[serde(other)]
    Unsupported,
}

impl WebhookEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Message(_) => "message",
            WebhookEvent::Follow(_) => "follow",
            WebhookEvent::Join(_) => "join",
            WebhookEvent::Postback(_) => "postback",
            WebhookEvent::Beacon(_) => "beacon",
            WebhookEvent::Unsupported => "unsupported",
        }
    }

    pub fn source(&self) -> Option<&EventSource> {
        match self {
            WebhookEvent::Message(e) => Some(&e.source),
            WebhookEvent::Follow(e) | WebhookEvent::Join(e) | WebhookEvent::Beacon(e) => {
                Some(&e.source)
            }
            WebhookEvent::Postback(e) => Some(&e.source),
            WebhookEvent::Unsupported => None,
        }
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl EventSource {
    /// One-to-one chat with the bot (not a group or room).
    pub fn is_private_talk(&self) -> bool {
        self.group_id.is_none() && self.room_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyableEvent {
    #[serde(default)]
    pub reply_token: Option<String>,
    pub source: EventSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub reply_token: String,
    pub source: EventSource,
    pub message: EventMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventMessage {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackEvent {
    pub reply_token: String,
    pub source: EventSource,
    pub postback: PostbackContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostbackContent {
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_batch() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "destination": "Ubot",
            "events": [
                {
                    "type": "message",
                    "replyToken": "r1",
                    "source": {"type": "user", "userId": "U1"},
                    "message": {"type": "text", "id": "1", "text": "where am i"}
                },
                {
                    "type": "message",
                    "replyToken": "r2",
                    "source": {"type": "group", "groupId": "G1", "userId": "U1"},
                    "message": {"type": "sticker", "id": "2", "packageId": "1"}
                },
                {
                    "type": "postback",
                    "replyToken": "r3",
                    "source": {"type": "user", "userId": "U1"},
                    "postback": {"data": "action=checkin&locationId=2"}
                },
                {"type": "unfollow", "source": {"type": "user", "userId": "U1"}}
            ]
        }))
        .unwrap();

        assert_eq!(payload.events.len(), 4);
        match &payload.events[0] {
            WebhookEvent::Message(m) => {
                assert!(m.source.is_private_talk());
                assert!(matches!(&m.message, EventMessage::Text { text } if text == "where am i"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &payload.events[1] {
            WebhookEvent::Message(m) => {
                assert!(!m.source.is_private_talk());
                assert!(matches!(m.message, EventMessage::Other));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(payload.events[2].kind(), "postback");
        assert!(matches!(payload.events[3], WebhookEvent::Unsupported));
        assert!(payload.events[3].source().is_none());
    }
}
