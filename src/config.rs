// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Process-level settings only. Locations, cards and reply texts live in the
//! rally config file loaded by [`crate::services::LocationDirectory`].

use std::env;
use std::time::Duration;

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// LINE channel access token (bearer auth for replies)
    pub channel_access_token: String,
    /// LINE channel secret (webhook signature key)
    pub channel_secret: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Which storage backend to use
    pub storage_backend: StorageBackend,
    /// Path to the rally config JSON
    pub rally_config_path: String,
    /// Enables force check-in and diagnostic replies
    pub debug_mode: bool,
    /// Rich menu shown before enrollment
    pub rich_menu_join: Option<String>,
    /// Rich menu shown once enrolled
    pub rich_menu_radar: Option<String>,
    /// Local UTC offset for clock-time expressions (seconds east)
    pub utc_offset_seconds: i32,
    /// Deadline for processing a single webhook event
    pub event_timeout: Duration,
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            channel_access_token: "test_access_token".to_string(),
            channel_secret: "test_channel_secret".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            rally_config_path: "data/stamp_rally.json".to_string(),
            debug_mode: false,
            rich_menu_join: Some("richmenu-join".to_string()),
            rich_menu_radar: Some("richmenu-radar".to_string()),
            utc_offset_seconds: 9 * 3600,
            event_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .as_str()
        {
            "firestore" => StorageBackend::Firestore,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let tz_offset_hours: i32 = parse_or("TZ_OFFSET_HOURS", 9)?;
        if !(-23..=23).contains(&tz_offset_hours) {
            return Err(ConfigError::Invalid {
                name: "TZ_OFFSET_HOURS",
                value: tz_offset_hours.to_string(),
            });
        }

        Ok(Self {
            channel_access_token: env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("LINE_CHANNEL_ACCESS_TOKEN"))?,
            channel_secret: env::var("LINE_CHANNEL_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("LINE_CHANNEL_SECRET"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend,
            rally_config_path: env::var("RALLY_CONFIG_PATH")
                .unwrap_or_else(|_| "data/stamp_rally.json".to_string()),
            debug_mode: env::var("DEBUG_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            rich_menu_join: env::var("RICH_MENU_JOIN").ok().filter(|v| !v.is_empty()),
            rich_menu_radar: env::var("RICH_MENU_RADAR").ok().filter(|v| !v.is_empty()),
            utc_offset_seconds: tz_offset_hours * 3600,
            event_timeout: Duration::from_secs(parse_or("EVENT_TIMEOUT_SECS", 10)?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
