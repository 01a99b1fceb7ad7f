// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stamp Rally: a LINE bot that awards stamps for visiting checkpoints
//!
//! Visitors wear a beacon badge. Receivers at each checkpoint log the badge,
//! and the bot accepts a check-in only when a recent detection matches the
//! checkpoint's receiver.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use routes::webhook::WebhookStats;
use services::StampRallyService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub rally: StampRallyService,
    pub webhook_stats: WebhookStats,
}

impl AppState {
    pub fn new(config: Config, rally: StampRallyService) -> Self {
        Self {
            config,
            rally,
            webhook_stats: WebhookStats::default(),
        }
    }
}
