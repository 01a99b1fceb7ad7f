// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LINE Messaging API client.
//!
//! The rally only needs two calls: reply to an event and switch a user's
//! rich menu. Both go through [`MessagingGateway`] so flows can be tested
//! without the network.

use crate::error::AppError;
use crate::models::Message;
use async_trait::async_trait;
use std::time::Duration;

/// LINE accepts at most five messages per reply.
pub const MAX_REPLY_MESSAGES: usize = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound side of the chat platform.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Reply to an event with an ordered list of messages.
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), AppError>;

    /// Link a rich menu to a user.
    async fn link_rich_menu(&self, user_id: &str, rich_menu_id: &str) -> Result<(), AppError>;
}

/// LINE Messaging API client.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    channel_access_token: String,
}

impl LineClient {
    pub fn new(channel_access_token: String) -> Result<Self, AppError> {
        Self::with_base_url(channel_access_token, "https://api.line.me/v2/bot".to_string())
    }

    /// Client against a different API host (tests, staging proxies).
    pub fn with_base_url(channel_access_token: String, base_url: String) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            channel_access_token,
        })
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("LINE rate limit hit (429)");
        }

        Err(AppError::Messaging(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl MessagingGateway for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), AppError> {
        if messages.len() > MAX_REPLY_MESSAGES {
            tracing::warn!(
                count = messages.len(),
                "Reply exceeds message limit, truncating"
            );
        }
        let messages = &messages[..messages.len().min(MAX_REPLY_MESSAGES)];

        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": messages,
        });

        let response = self
            .http
            .post(format!("{}/message/reply", self.base_url))
            .bearer_auth(&self.channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Messaging(e.to_string()))?;

        self.check_response(response).await?;
        tracing::debug!(count = messages.len(), "Reply sent");
        Ok(())
    }

    async fn link_rich_menu(&self, user_id: &str, rich_menu_id: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/user/{}/richmenu/{}",
            self.base_url,
            urlencoding::encode(user_id),
            urlencoding::encode(rich_menu_id)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .send()
            .await
            .map_err(|e| AppError::Messaging(format!("Rich menu link failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::debug!(user_id, rich_menu_id, "Rich menu linked");
        Ok(())
    }
}
