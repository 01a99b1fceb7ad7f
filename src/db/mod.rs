// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The rally engine talks to storage through the repository traits below;
//! [`FirestoreDb`] backs production and [`MemoryDb`] backs tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::Result;
use crate::models::{BeaconAttachment, Detection, QrCode, User};
use chrono::Utc;
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const BEACON_ATTACHMENTS: &str = "beacon_attachments";
    pub const BEACON_DETECTIONS: &str = "beacon_detections";
    pub const QR_CODES: &str = "qr_codes";
}

/// Rally participants, keyed by platform user ID.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: &User) -> Result<()>;

    async fn update_user(&self, user: &User) -> Result<()>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;
}

/// Beacon badges attached to users. Read-only for the rally.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Live (`attached = true`) badges of a user.
    async fn list_attached(&self, user_id: &str) -> Result<Vec<BeaconAttachment>>;

    /// Number of live badges of a user.
    async fn count_attached(&self, user_id: &str) -> Result<usize> {
        Ok(self.list_attached(user_id).await?.len())
    }
}

/// Detection log written by the upstream feed.
#[async_trait]
pub trait DetectionRepository: Send + Sync {
    /// Most recent detections of a beacon, newest first.
    async fn latest_detections(&self, beacon_id: &str, limit: u32) -> Result<Vec<Detection>>;
}

/// Per-user QR codes, keyed by user ID.
#[async_trait]
pub trait QrCodeRepository: Send + Sync {
    async fn find_qr_code(&self, user_id: &str) -> Result<Option<QrCode>>;

    async fn create_qr_code(&self, code: &QrCode) -> Result<()>;

    /// The user's existing code, or a newly issued and stored one.
    async fn find_or_create_qr_code(&self, user_id: &str) -> Result<QrCode> {
        if let Some(code) = self.find_qr_code(user_id).await? {
            return Ok(code);
        }
        let code = QrCode::issue(user_id, Utc::now());
        self.create_qr_code(&code).await?;
        tracing::info!(user_id, "QR code issued");
        Ok(code)
    }
}

/// The repositories the rally reads and writes.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub attachments: Arc<dyn AttachmentRepository>,
    pub detections: Arc<dyn DetectionRepository>,
    pub qr_codes: Arc<dyn QrCodeRepository>,
}

impl Repositories {
    /// Use a single backend for every repository.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + AttachmentRepository
            + DetectionRepository
            + QrCodeRepository
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            attachments: store.clone(),
            detections: store.clone(),
            qr_codes: store,
        }
    }
}
