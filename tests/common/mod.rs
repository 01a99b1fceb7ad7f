// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{Duration, Utc};
use stamp_rally::config::Config;
use stamp_rally::db::{FirestoreDb, MemoryDb, Repositories};
use stamp_rally::error::AppError;
use stamp_rally::middleware::signature::sign;
use stamp_rally::models::{Detection, Message};
use stamp_rally::routes::create_router;
use stamp_rally::services::{LocationDirectory, MessagingGateway, RallyOptions, StampRallyService};
use stamp_rally::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

/// Three checkpoints on one card, 30 minute check-in window.
#[allow(dead_code)]
pub const TEST_RALLY_JSON: &str = r#"{
    "settings": {"card_id": 1, "checkin_time_threshold": 30},
    "locations": [
        {"id": 1, "receiver_id": "R1", "keyword": "Hint 1", "title": "Gate",
         "hint": "By the gate", "image_url": "https://cdn.test/hints/1.jpg"},
        {"id": 2, "receiver_id": "R2", "keyword": "Hint 2", "title": "Hall",
         "hint": "In the hall", "image_url": "https://cdn.test/hints/2.jpg"},
        {"id": 3, "receiver_id": "R3", "keyword": "Hint 3", "title": "Cafe",
         "hint": "Near the coffee", "image_url": "https://cdn.test/hints/3.jpg"}
    ],
    "stamp_cards": {
        "1": {
            "base_url": "https://cdn.test/cards",
            "complete_message": "Rally complete!",
            "area": {"x": 0, "y": 0, "width": 1040, "height": 1040},
            "checkpoints": [
                {"location_id": 1, "area": {"x": 0, "y": 0, "width": 520, "height": 520}},
                {"location_id": 2, "area": {"x": 520, "y": 0, "width": 520, "height": 520}},
                {"location_id": 3, "area": {"x": 0, "y": 520, "width": 520, "height": 520}}
            ]
        }
    },
    "keywords": [
        {"keywords": ["Where am I"], "action": "last_location"},
        {"keywords": ["Stamp card"], "action": "stamp_card"},
        {"keywords": ["Hint"], "action": "location_hint"},
        {"keywords": ["Map"], "action": "show_map"},
        {"keywords": ["QR code"], "action": "show_qr_code"}
    ],
    "map_url": "https://cdn.test/map.png",
    "qr_image_base_url": "https://cdn.test/qr/"
}"#;

/// Gateway that records everything instead of calling LINE.
#[derive(Default)]
pub struct RecordingGateway {
    pub replies: Mutex<Vec<(String, Vec<Message>)>>,
    pub menus: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
    slow_reply: Mutex<Option<(String, StdDuration)>>,
}

#[allow(dead_code)]
impl RecordingGateway {
    /// Make every subsequent call fail.
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Stall the reply to `reply_token` for `delay` before recording it.
    pub fn delay_reply(&self, reply_token: &str, delay: StdDuration) {
        *self.slow_reply.lock().unwrap() = Some((reply_token.to_string(), delay));
    }

    pub fn replies(&self) -> Vec<(String, Vec<Message>)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn menus(&self) -> Vec<(String, String)> {
        self.menus.lock().unwrap().clone()
    }

    /// Texts of the most recent reply.
    pub fn last_reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .last()
            .map(|(_, messages)| {
                messages
                    .iter()
                    .filter_map(|m| m.as_text().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Messaging("LINE API returned 500".to_string()));
        }
        let delay = self
            .slow_reply
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(token, _)| token == reply_token)
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages.to_vec()));
        Ok(())
    }

    async fn link_rich_menu(&self, user_id: &str, rich_menu_id: &str) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Messaging("LINE API returned 500".to_string()));
        }
        self.menus
            .lock()
            .unwrap()
            .push((user_id.to_string(), rich_menu_id.to_string()));
        Ok(())
    }
}

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn test_directory() -> Arc<LocationDirectory> {
    Arc::new(LocationDirectory::load_from_json(TEST_RALLY_JSON).expect("test rally config"))
}

/// A detection of `beacon_id` by `receiver_id`, `minutes_ago` minutes before now.
#[allow(dead_code)]
pub fn detection(beacon_id: &str, receiver_id: &str, minutes_ago: i64) -> Detection {
    Detection {
        beacon_id: beacon_id.to_string(),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        receiver_id: receiver_id.to_string(),
        location_name: format!("Near {}", receiver_id),
        map_image_url: format!("https://cdn.test/maps/{}.png", receiver_id),
    }
}

/// Everything a test needs to drive the rally and inspect its effects.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub gateway: Arc<RecordingGateway>,
}

/// Rally service over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_service(config: &Config) -> (StampRallyService, MemoryDb, Arc<RecordingGateway>) {
    let db = MemoryDb::new();
    let gateway = Arc::new(RecordingGateway::default());
    let service = StampRallyService::new(
        test_directory(),
        Repositories::from_store(db.clone()),
        gateway.clone(),
        RallyOptions::from_config(config),
    );
    (service, db, gateway)
}

/// Create a test app with offline dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let (rally, db, gateway) = test_service(&config);
    let state = Arc::new(AppState::new(config, rally));
    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        gateway,
    }
}

/// Signature header value for `body` under the test channel secret.
#[allow(dead_code)]
pub fn sign_body(body: &str) -> String {
    sign(
        Config::test_default().channel_secret.as_bytes(),
        body.as_bytes(),
    )
    .expect("HMAC accepts any key length")
}
