// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod beacon;
pub mod event;
pub mod location;
pub mod message;
pub mod qrcode;
pub mod user;

pub use beacon::{BeaconAttachment, Detection};
pub use event::{WebhookEvent, WebhookPayload};
pub use location::{CardId, Location, LocationId, StampCard};
pub use message::Message;
pub use qrcode::QrCode;
pub use user::{StampProgress, User};
