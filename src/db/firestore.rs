// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the repositories for:
//! - Users (rally progress)
//! - Beacon attachments (badge ownership)
//! - Beacon detections (upstream proximity feed)
//! - QR codes (badge pairing at reception)

use crate::db::{
    collections, AttachmentRepository, DetectionRepository, QrCodeRepository, UserRepository,
};
use crate::error::AppError;
use crate::models::{BeaconAttachment, Detection, QrCode, User};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Seeding (emulator tests, local tooling) ────────────────

    /// Store a beacon attachment. Document ID is the beacon ID.
    pub async fn set_attachment(&self, attachment: &BeaconAttachment) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BEACON_ATTACHMENTS)
            .document_id(&attachment.beacon_id)
            .object(attachment)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store a detection record.
    pub async fn add_detection(&self, detection: &Detection) -> Result<(), AppError> {
        let doc_id = format!(
            "{}_{}",
            urlencoding::encode(&detection.beacon_id),
            detection.timestamp.timestamp_millis()
        );
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BEACON_DETECTIONS)
            .document_id(&doc_id)
            .object(detection)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for FirestoreDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.upsert_user(user).await?;
        tracing::info!(user_id = %user.user_id, card_id = user.card_id, "User created");
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.upsert_user(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        tracing::debug!(user_id, "Deleted user");
        Ok(())
    }
}

#[async_trait]
impl AttachmentRepository for FirestoreDb {
    async fn list_attached(&self, user_id: &str) -> Result<Vec<BeaconAttachment>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BEACON_ATTACHMENTS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("attached").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl DetectionRepository for FirestoreDb {
    async fn latest_detections(
        &self,
        beacon_id: &str,
        limit: u32,
    ) -> Result<Vec<Detection>, AppError> {
        let beacon_id = beacon_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BEACON_DETECTIONS)
            .filter(move |q| q.for_all([q.field("beacon_id").eq(beacon_id.clone())]))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl QrCodeRepository for FirestoreDb {
    async fn find_qr_code(&self, user_id: &str) -> Result<Option<QrCode>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::QR_CODES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_qr_code(&self, code: &QrCode) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::QR_CODES)
            .document_id(&code.user_id)
            .object(code)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
