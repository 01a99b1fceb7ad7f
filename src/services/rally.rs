// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stamp rally orchestration.
//!
//! Composes detection aggregation, check-in validation and the stamp state
//! machine into the user-facing flows:
//! 1. Enrollment (start the rally with an attached badge)
//! 2. Last-location query
//! 3. Check-in attempt
//! 4. Card view, hints, map, QR code and survey acknowledgement

use crate::config::Config;
use crate::db::{AttachmentRepository, QrCodeRepository, Repositories, UserRepository};
use crate::error::{AppError, Result};
use crate::models::message::{ButtonsTemplate, ImagemapMessage, PostbackAction, TemplateMessage};
use crate::models::{LocationId, Message, User, WebhookEvent};
use crate::services::checkin::{validate, Verdict};
use crate::services::detection::DetectionAggregator;
use crate::services::directory::{LocationDirectory, RallyMessages};
use crate::services::dispatch::{Action, EventRouter, RoutedEvent};
use crate::services::line::MessagingGateway;
use crate::services::recency::RecencyPolicy;
use crate::time_utils::{elapsed_expression, format_utc_rfc3339};
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;

/// Process-level switches for the rally flows.
#[derive(Debug, Clone)]
pub struct RallyOptions {
    /// Honour force check-ins and add diagnostic replies
    pub debug_mode: bool,
    pub rich_menu_join: Option<String>,
    pub rich_menu_radar: Option<String>,
    /// Offset for clock-time expressions
    pub utc_offset: FixedOffset,
}

impl RallyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debug_mode: config.debug_mode,
            rich_menu_join: config.rich_menu_join.clone(),
            rich_menu_radar: config.rich_menu_radar.clone(),
            utc_offset: FixedOffset::east_opt(config.utc_offset_seconds)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// The stamp rally bot.
pub struct StampRallyService {
    directory: Arc<LocationDirectory>,
    router: EventRouter,
    users: Arc<dyn UserRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    qr_codes: Arc<dyn QrCodeRepository>,
    aggregator: DetectionAggregator,
    gateway: Arc<dyn MessagingGateway>,
    recency: RecencyPolicy,
    options: RallyOptions,
}

impl StampRallyService {
    pub fn new(
        directory: Arc<LocationDirectory>,
        repositories: Repositories,
        gateway: Arc<dyn MessagingGateway>,
        options: RallyOptions,
    ) -> Self {
        let router = EventRouter::new(directory.keyword_rules());
        let recency = RecencyPolicy::new(directory.settings().checkin_time_threshold);
        Self {
            router,
            recency,
            users: repositories.users,
            attachments: repositories.attachments.clone(),
            qr_codes: repositories.qr_codes,
            aggregator: DetectionAggregator::new(
                repositories.attachments,
                repositories.detections,
            ),
            directory,
            gateway,
            options,
        }
    }

    fn messages(&self) -> &RallyMessages {
        self.directory.messages()
    }

    fn text(&self, pick: impl Fn(&RallyMessages) -> &String) -> Vec<Message> {
        vec![Message::text(pick(self.messages()).as_str())]
    }

    // ─── Event Handling ──────────────────────────────────────────

    /// Route and handle one webhook event. Ignored events succeed.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<()> {
        match self.router.route(event) {
            Some(routed) => self.handle(routed).await,
            None => Ok(()),
        }
    }

    /// Run an action and send its reply.
    ///
    /// Badge and configuration problems are answered with a user-visible
    /// message; storage and messaging failures propagate.
    pub async fn handle(&self, routed: RoutedEvent) -> Result<()> {
        let user_id = routed.user_id.as_str();
        tracing::info!(user_id, action = routed.action.name(), "Handling action");

        let messages = match self.run(user_id, &routed.action).await {
            Ok(messages) => messages,
            Err(e) if e.is_recoverable() => self.fallback_reply(user_id, &routed.action, &e),
            Err(e) => return Err(e),
        };

        if messages.is_empty() {
            return Ok(());
        }
        match routed.reply_token.as_deref() {
            Some(token) => self.gateway.reply(token, &messages).await,
            None => {
                tracing::warn!(user_id, "No reply token, dropping reply");
                Ok(())
            }
        }
    }

    fn fallback_reply(&self, user_id: &str, action: &Action, error: &AppError) -> Vec<Message> {
        match error {
            AppError::NoBadge { .. } => self.text(|m| &m.badge_not_registered),
            _ => {
                tracing::error!(
                    user_id,
                    action = action.name(),
                    error = %error,
                    "Configuration lookup failed, sending fallback reply"
                );
                self.text(|m| &m.unavailable)
            }
        }
    }

    /// Run an action and return the reply messages without sending them.
    pub async fn run(&self, user_id: &str, action: &Action) -> Result<Vec<Message>> {
        match action {
            Action::Follow => self.follow(user_id).await,
            Action::Join => Ok(Vec::new()),
            Action::StartRally => self.start_rally(user_id).await,
            Action::CheckIn { location_id, force } => {
                self.check_in(user_id, *location_id, *force).await
            }
            Action::AcknowledgeSurvey => self.acknowledge_survey(user_id).await,
            Action::LastLocation => self.last_location(user_id).await,
            Action::StampCard => self.stamp_card(user_id).await,
            Action::LocationHint { text } => Ok(self.location_hint(text)),
            Action::ShowMap => Ok(self.show_map()),
            Action::ShowQrCode => self.show_qr_code(user_id).await,
            Action::RequireConsent => Ok(self.text(|m| &m.terms_not_accepted)),
            Action::DefaultReply => Ok(self.text(|m| &m.default)),
        }
    }

    // ─── Flows ───────────────────────────────────────────────────

    /// Reset the user on (re-)follow: join menu, no rally record.
    pub async fn follow(&self, user_id: &str) -> Result<Vec<Message>> {
        tokio::try_join!(
            self.switch_menu(user_id, self.options.rich_menu_join.as_deref()),
            self.users.delete_user(user_id),
        )?;
        tracing::info!(user_id, "Rally state reset");

        if self.options.debug_mode {
            Ok(vec![Message::text("DEBUG: rally state has been reset.")])
        } else {
            Ok(Vec::new())
        }
    }

    /// Enroll a user who holds at least one attached badge.
    pub async fn start_rally(&self, user_id: &str) -> Result<Vec<Message>> {
        if self.attachments.count_attached(user_id).await? == 0 {
            tracing::info!(user_id, "Enrollment refused: no badge");
            return Ok(self.text(|m| &m.badge_required));
        }

        if self.users.get_user(user_id).await?.is_some() {
            tracing::info!(user_id, "Already enrolled");
            self.switch_menu(user_id, self.options.rich_menu_radar.as_deref())
                .await?;
            return Ok(self.text(|m| &m.already_enrolled));
        }

        let card_id = self.directory.settings().card_id;
        let user = User::enroll(user_id, card_id, &format_utc_rfc3339(Utc::now()));
        self.users.create_user(&user).await?;
        self.switch_menu(user_id, self.options.rich_menu_radar.as_deref())
            .await?;
        tracing::info!(user_id, card_id, "User enrolled");

        Ok(self.text(|m| &m.enrolled))
    }

    /// Report where the user's badge was last seen.
    pub async fn last_location(&self, user_id: &str) -> Result<Vec<Message>> {
        let report = match self.aggregator.recent_detections(user_id).await {
            Ok(report) => report,
            Err(AppError::NoBadge { .. }) => return Ok(self.text(|m| &m.badge_not_registered)),
            Err(e) => return Err(e),
        };

        let lookup_failures = report.failures().count();
        let detections = report.into_detections()?;
        tracing::debug!(
            user_id,
            detections = detections.len(),
            lookup_failures,
            "Last location lookup"
        );
        let Some(latest) = detections.iter().max_by_key(|d| d.timestamp) else {
            return Ok(self.text(|m| &m.no_location_log));
        };

        let elapsed = elapsed_expression(Utc::now(), latest.timestamp, self.options.utc_offset);
        let text = self
            .messages()
            .last_location
            .replace("{location}", &latest.location_name)
            .replace("{elapsed}", &elapsed);

        Ok(vec![
            Message::image(latest.map_image_url.as_str()),
            Message::text(text),
        ])
    }

    /// Attempt to collect the stamp for `location_id`.
    pub async fn check_in(
        &self,
        user_id: &str,
        location_id: LocationId,
        force: bool,
    ) -> Result<Vec<Message>> {
        let location = self.directory.by_id(location_id)?;

        let Some(mut user) = self.users.get_user(user_id).await? else {
            // Badge precedence: nobody without a badge can have enrolled
            if self.attachments.count_attached(user_id).await? == 0 {
                return Ok(self.text(|m| &m.badge_not_registered));
            }
            return Ok(self.text(|m| &m.not_enrolled));
        };
        let card = self.directory.card(user.card_id)?;
        if !card.contains(location_id) {
            return Err(AppError::Configuration(format!(
                "location {} is not on card {}",
                location_id, user.card_id
            )));
        }

        let force = if force && !self.options.debug_mode {
            tracing::warn!(user_id, location_id, "Force check-in ignored outside debug mode");
            false
        } else {
            force
        };

        let (detections, lookup_failures) = if force {
            (Vec::new(), 0)
        } else {
            match self.aggregator.recent_detections(user_id).await {
                Ok(report) => {
                    let failed = report.failures().count();
                    (report.into_detections()?, failed)
                }
                Err(AppError::NoBadge { .. }) => {
                    return Ok(self.text(|m| &m.badge_not_registered))
                }
                Err(e) => return Err(e),
            }
        };

        let now = Utc::now();
        let verdict = validate(&user, location, &detections, force, self.recency, now);
        tracing::info!(
            user_id,
            location_id,
            verdict = verdict.as_str(),
            forced = force,
            detections = detections.len(),
            lookup_failures,
            "Check-in validated"
        );

        match verdict {
            Verdict::AlreadyCollected => Ok(self.text(|m| &m.already_collected)),
            Verdict::Rejected => Ok(self.text(|m| &m.checkin_rejected)),
            Verdict::Accepted => {
                let now = format_utc_rfc3339(now);
                user.award_stamp(location_id, &now);

                let awarded = self
                    .messages()
                    .stamp_awarded
                    .replace("{id}", &location_id.to_string());
                let mut messages = vec![
                    Message::image(card.stamp_image_url(user.card_id, location_id)),
                    Message::text(if force {
                        format!("DEBUG: {}", awarded)
                    } else {
                        awarded
                    }),
                ];

                if user.is_complete(card) {
                    tracing::info!(user_id, card_id = user.card_id, "Stamp card completed");
                    messages.push(Message::text(self.messages().complete.as_str()));
                    if user.take_survey_offer(&now) {
                        messages.push(Message::text(self.messages().request_enquete.as_str()));
                    }
                }

                self.users.update_user(&user).await?;
                Ok(messages)
            }
        }
    }

    /// Show the user's stamp card.
    pub async fn stamp_card(&self, user_id: &str) -> Result<Vec<Message>> {
        let Some(mut user) = self.users.get_user(user_id).await? else {
            return Ok(self.text(|m| &m.not_enrolled));
        };
        let card = self.directory.card(user.card_id)?;

        let mut imagemap =
            ImagemapMessage::new(card.card_image_url(user.card_id, &user.stamps), "Stamp card");
        let mut messages = Vec::new();

        if user.is_complete(card) {
            imagemap.add_message_action(card.area, card.complete_message.as_str());
            messages.push(Message::Imagemap(imagemap));
            messages.push(Message::text(self.messages().complete.as_str()));
            if user.take_survey_offer(&format_utc_rfc3339(Utc::now())) {
                messages.push(Message::text(self.messages().request_enquete.as_str()));
                self.users.update_user(&user).await?;
            }
        } else {
            for checkpoint in &card.checkpoints {
                if user.has_stamp(checkpoint.location_id) {
                    continue;
                }
                let location = self.directory.by_id(checkpoint.location_id)?;
                imagemap.add_message_action(checkpoint.area, location.keyword.as_str());
            }
            messages.push(Message::Imagemap(imagemap));
            messages.push(Message::text(self.messages().card_hint.as_str()));
            if self.options.debug_mode {
                messages.push(Message::text(format!(
                    "DEBUG: collected {:?}",
                    user.stamps
                )));
            }
        }

        Ok(messages)
    }

    /// Hint card for the location named in `text`, with a check-in button.
    pub fn location_hint(&self, text: &str) -> Vec<Message> {
        let Some(location) = self.directory.by_keyword(text) else {
            return self.text(|m| &m.hint_prompt);
        };

        let mut buttons = ButtonsTemplate::new(location.hint.as_str());
        buttons.thumbnail_image_url = Some(location.image_url.clone());
        buttons.title = Some(location.title.clone());

        let label = &self.messages().checkin_button;
        let mut checkin = PostbackAction::new(
            format!("action=checkin&locationId={}", location.id),
            label.as_str(),
        );
        checkin.display_text = Some(label.clone());
        buttons.actions.push(checkin);

        if self.options.debug_mode {
            buttons.actions.push(PostbackAction::new(
                format!("action=checkin&force=1&locationId={}", location.id),
                "DEBUG: force",
            ));
        }

        vec![Message::Template(TemplateMessage {
            alt_text: location.keyword.clone(),
            template: buttons,
        })]
    }

    pub fn show_map(&self) -> Vec<Message> {
        match self.directory.map_url() {
            Some(url) => vec![Message::text(url)],
            None => self.text(|m| &m.unavailable),
        }
    }

    /// The user's pairing QR code, with a button that starts the rally.
    pub async fn show_qr_code(&self, user_id: &str) -> Result<Vec<Message>> {
        let image_base_url = self.directory.qr_image_base_url()?;
        let code = self.qr_codes.find_or_create_qr_code(user_id).await?;

        let messages = self.messages();
        let mut buttons = ButtonsTemplate::new(messages.qrcode_text.as_str());
        buttons.thumbnail_image_url = Some(code.image_url(image_base_url));
        buttons.title = Some(messages.qrcode_title.clone());
        buttons
            .actions
            .push(PostbackAction::new("action=start", messages.qrcode_button.as_str()));

        Ok(vec![Message::Template(TemplateMessage {
            alt_text: messages.qrcode_title.clone(),
            template: buttons,
        })])
    }

    /// Record that the user has taken the survey.
    pub async fn acknowledge_survey(&self, user_id: &str) -> Result<Vec<Message>> {
        let Some(mut user) = self.users.get_user(user_id).await? else {
            return Ok(self.text(|m| &m.not_enrolled));
        };
        if user.take_survey_offer(&format_utc_rfc3339(Utc::now())) {
            self.users.update_user(&user).await?;
        }
        Ok(self.text(|m| &m.enquete_thanks))
    }

    async fn switch_menu(&self, user_id: &str, rich_menu_id: Option<&str>) -> Result<()> {
        match rich_menu_id {
            Some(id) => self.gateway.link_rich_menu(user_id, id).await,
            None => {
                tracing::warn!(user_id, "Rich menu not configured, skipping switch");
                Ok(())
            }
        }
    }
}
