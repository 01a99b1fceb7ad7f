// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod checkin;
pub mod detection;
pub mod directory;
pub mod dispatch;
pub mod line;
pub mod rally;
pub mod recency;

pub use checkin::Verdict;
pub use detection::DetectionAggregator;
pub use directory::{DirectoryError, LocationDirectory};
pub use dispatch::{Action, EventRouter};
pub use line::{LineClient, MessagingGateway};
pub use rally::{RallyOptions, StampRallyService};
pub use recency::RecencyPolicy;
