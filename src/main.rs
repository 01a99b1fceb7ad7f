// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stamp Rally API Server
//!
//! Receives LINE webhook events and runs the beacon-verified stamp rally.

use stamp_rally::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, Repositories},
    services::{LineClient, LocationDirectory, RallyOptions, StampRallyService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        debug_mode = config.debug_mode,
        "Starting Stamp Rally API"
    );

    // Load checkpoints, cards and reply texts
    tracing::info!(path = %config.rally_config_path, "Loading rally config");
    let directory = Arc::new(LocationDirectory::load_from_file(&config.rally_config_path)?);

    let repositories = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Firestore connected");
            Repositories::from_store(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, state is lost on restart");
            Repositories::from_store(MemoryDb::new())
        }
    };

    let line = Arc::new(LineClient::new(config.channel_access_token.clone())?);

    let rally = StampRallyService::new(
        directory,
        repositories,
        line,
        RallyOptions::from_config(&config),
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), rally));

    // Build router
    let app = stamp_rally::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stamp_rally=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
