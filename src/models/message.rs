// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound reply messages (LINE Messaging API shapes).

use crate::models::location::TapArea;
use serde::Serialize;

/// Imagemap images are authored at 1040px width.
pub const IMAGEMAP_BASE_WIDTH: u32 = 1040;

/// A single reply message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessage),
    Image(ImageMessage),
    Imagemap(ImagemapMessage),
    Template(TemplateMessage),
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(TextMessage { text: text.into() })
    }

    /// Image message using the same URL for the preview.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Message::Image(ImageMessage {
            original_content_url: url.clone(),
            preview_image_url: url,
        })
    }

    /// Text content, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    pub original_content_url: String,
    pub preview_image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseSize {
    pub width: u32,
    pub height: u32,
}

/// Tap action on an imagemap that sends `text` as the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagemapAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub area: TapArea,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagemapMessage {
    pub base_url: String,
    pub alt_text: String,
    pub base_size: BaseSize,
    pub actions: Vec<ImagemapAction>,
}

impl ImagemapMessage {
    pub fn new(base_url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            alt_text: alt_text.into(),
            base_size: BaseSize {
                width: IMAGEMAP_BASE_WIDTH,
                height: IMAGEMAP_BASE_WIDTH,
            },
            actions: Vec::new(),
        }
    }

    pub fn add_message_action(&mut self, area: TapArea, text: impl Into<String>) {
        self.actions.push(ImagemapAction {
            kind: "message",
            area,
            text: text.into(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMessage {
    pub alt_text: String,
    pub template: ButtonsTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsTemplate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub actions: Vec<PostbackAction>,
}

impl ButtonsTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "buttons",
            thumbnail_image_url: None,
            title: None,
            text: text.into(),
            actions: Vec::new(),
        }
    }
}

/// Button that posts `data` back to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

impl PostbackAction {
    pub fn new(data: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: "postback",
            data: data.into(),
            label: label.into(),
            display_text: None,
        }
    }
}
