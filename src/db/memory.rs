// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory storage backend for tests and local runs.

use crate::db::{AttachmentRepository, DetectionRepository, QrCodeRepository, UserRepository};
use crate::error::AppError;
use crate::models::{BeaconAttachment, Detection, QrCode, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    /// beacon_id -> attachment
    attachments: Arc<DashMap<String, BeaconAttachment>>,
    /// beacon_id -> detections in insertion order
    detections: Arc<DashMap<String, Vec<Detection>>>,
    qr_codes: Arc<DashMap<String, QrCode>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a badge to a user (replacing any previous owner).
    pub fn attach_beacon(&self, user_id: &str, beacon_id: &str) {
        self.attachments.insert(
            beacon_id.to_string(),
            BeaconAttachment {
                beacon_id: beacon_id.to_string(),
                user_id: user_id.to_string(),
                attached: true,
            },
        );
    }

    /// Mark a badge as detached, keeping its detection history.
    pub fn detach_beacon(&self, beacon_id: &str) {
        if let Some(mut attachment) = self.attachments.get_mut(beacon_id) {
            attachment.attached = false;
        }
    }

    pub fn record_detection(&self, detection: Detection) {
        self.detections
            .entry(detection.beacon_id.clone())
            .or_default()
            .push(detection);
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.users.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl AttachmentRepository for MemoryDb {
    async fn list_attached(&self, user_id: &str) -> Result<Vec<BeaconAttachment>, AppError> {
        let mut attached: Vec<BeaconAttachment> = self
            .attachments
            .iter()
            .filter(|a| a.user_id == user_id && a.attached)
            .map(|a| a.value().clone())
            .collect();
        attached.sort_by(|a, b| a.beacon_id.cmp(&b.beacon_id));
        Ok(attached)
    }
}

#[async_trait]
impl DetectionRepository for MemoryDb {
    async fn latest_detections(
        &self,
        beacon_id: &str,
        limit: u32,
    ) -> Result<Vec<Detection>, AppError> {
        let mut detections = self
            .detections
            .get(beacon_id)
            .map(|d| d.clone())
            .unwrap_or_default();
        detections.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        detections.truncate(limit as usize);
        Ok(detections)
    }
}

#[async_trait]
impl QrCodeRepository for MemoryDb {
    async fn find_qr_code(&self, user_id: &str) -> Result<Option<QrCode>, AppError> {
        Ok(self.qr_codes.get(user_id).map(|c| c.clone()))
    }

    async fn create_qr_code(&self, code: &QrCode) -> Result<(), AppError> {
        self.qr_codes.insert(code.user_id.clone(), code.clone());
        Ok(())
    }

    /// Atomic per user: concurrent requests get the same code.
    async fn find_or_create_qr_code(&self, user_id: &str) -> Result<QrCode, AppError> {
        let code = self
            .qr_codes
            .entry(user_id.to_string())
            .or_insert_with(|| QrCode::issue(user_id, chrono::Utc::now()));
        Ok(code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn detection(beacon_id: &str, minutes_ago: i64) -> Detection {
        Detection {
            beacon_id: beacon_id.to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            receiver_id: format!("R{}", minutes_ago),
            location_name: "Hall".to_string(),
            map_image_url: "https://x/map.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_latest_detection_is_newest_regardless_of_insert_order() {
        let db = MemoryDb::new();
        db.record_detection(detection("B1", 5));
        db.record_detection(detection("B1", 1));
        db.record_detection(detection("B1", 9));

        let latest = db.latest_detections("B1", 1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].receiver_id, "R1");
        assert!(db.latest_detections("B2", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detached_beacons_are_not_listed() {
        let db = MemoryDb::new();
        db.attach_beacon("U1", "B1");
        db.attach_beacon("U1", "B2");
        db.attach_beacon("U2", "B3");
        db.detach_beacon("B2");

        let attached = db.list_attached("U1").await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].beacon_id, "B1");
        assert_eq!(db.count_attached("U2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_user_crud() {
        let db = MemoryDb::new();
        let user = User::enroll("U1", 1, "2026-03-14T06:30:00Z");
        db.create_user(&user).await.unwrap();
        assert_eq!(db.get_user("U1").await.unwrap(), Some(user));
        db.delete_user("U1").await.unwrap();
        assert_eq!(db.get_user("U1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_qr_code_issued_once_per_user() {
        let db = MemoryDb::new();
        assert!(db.find_qr_code("U1").await.unwrap().is_none());

        let first = db.find_or_create_qr_code("U1").await.unwrap();
        let again = db.find_or_create_qr_code("U1").await.unwrap();
        let other = db.find_or_create_qr_code("U2").await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first.code_id, other.code_id);
        assert_eq!(db.find_qr_code("U1").await.unwrap(), Some(first));
    }
}
