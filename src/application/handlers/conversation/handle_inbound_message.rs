//! HandleInboundMessageHandler - The conversation orchestrator.
//!
//! One inbound chat message is handled to completion per call:
//!
//! 1. Find or create the lead for the sender.
//! 2. Record the message in the idempotency ledger before any other work
//!    (insert-early). A duplicate stops here.
//! 3. Discard messages older than the last one recorded for the lead.
//! 4. Control keywords (opt-out first, then resume, continue and
//!    human-request) take priority over status routing.
//! 5. Dispatch on the status route table.
//!
//! The handler never delivers messages. It commits its state changes and
//! returns the outbound intents for `deliver_outbound`.

use std::sync::Arc;

use crate::config::{ConversationConfig, FeatureFlags};
use crate::domain::conversation::{copy, route_for, InboundMessage, OutboundMessage, Route};
use crate::domain::foundation::{ChannelId, LeadId, Timestamp};
use crate::domain::lead::{
    build_summary, derive_qualification, CurrentAnswers, HandoffContext, Lead, LeadError,
    LeadPatch, LeadStatus, NewAnswer, ParseField, QualificationPolicy, QuestionKey,
};
use crate::domain::parsing::{
    classify_keyword, detect_answer_bundle, detect_wrong_field, normalize, parse_budget,
    parse_dimensions, parse_location, parse_slot_selection, parse_yes_no, Keyword,
};
use crate::ports::{
    AnswerRepository, InboundOrdering, LeadRepository, ProcessedEvent, ProcessedEventStore,
    RowLock, SaveResult, StatusUpdate, StepAdvance,
};

use super::repair_tracker::{RepairDecision, RepairTracker};

/// Ledger event type for chat messages.
const MESSAGE_EVENT_TYPE: &str = "message";

/// Stored in place of text when a client sends only an attachment.
const MEDIA_PLACEHOLDER: &str = "[media attachment]";

/// Command to process one inbound chat message.
#[derive(Debug, Clone)]
pub struct HandleInboundMessageCommand {
    pub message: InboundMessage,
}

/// Result of processing an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleInboundMessageResult {
    /// Already in the ledger; nothing was done.
    Duplicate { lead_id: LeadId },
    /// Older than the lead's last recorded message; discarded.
    OutOfOrder { lead_id: LeadId },
    /// Processed. `outbound` may be empty.
    Processed {
        lead_id: LeadId,
        status: LeadStatus,
        outbound: Vec<OutboundMessage>,
    },
}

impl HandleInboundMessageResult {
    pub fn outbound(&self) -> &[OutboundMessage] {
        match self {
            HandleInboundMessageResult::Processed { outbound, .. } => outbound,
            _ => &[],
        }
    }
}

/// Handler for inbound chat messages.
pub struct HandleInboundMessageHandler {
    leads: Arc<dyn LeadRepository>,
    answers: Arc<dyn AnswerRepository>,
    ledger: Arc<dyn ProcessedEventStore>,
    repair: RepairTracker,
    config: ConversationConfig,
    policy: QualificationPolicy,
    artist_channel: Option<ChannelId>,
}

/// Per-message state threaded through the dispatch helpers.
struct Turn {
    lead: Lead,
    text: String,
    has_media: bool,
    now: Timestamp,
    outbound: Vec<OutboundMessage>,
}

impl Turn {
    fn reply(&mut self, text: impl Into<String>) {
        self.outbound.push(OutboundMessage::to_client(
            self.lead.id,
            self.lead.channel_id.clone(),
            text,
        ));
    }
}

impl HandleInboundMessageHandler {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        answers: Arc<dyn AnswerRepository>,
        ledger: Arc<dyn ProcessedEventStore>,
        config: ConversationConfig,
        features: FeatureFlags,
    ) -> Self {
        let repair = RepairTracker::new(leads.clone(), config.parse_failure_threshold);
        let policy = config.qualification_policy(&features);
        let artist_channel = if features.notify_artist {
            config.artist_channel_id()
        } else {
            None
        };
        Self {
            leads,
            answers,
            ledger,
            repair,
            config,
            policy,
            artist_channel,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleInboundMessageCommand,
    ) -> Result<HandleInboundMessageResult, LeadError> {
        let message = cmd.message;
        let now = message.received_at;

        let (lead, created) = self.leads.get_or_create(&message.sender, now).await?;
        if created {
            tracing::info!(lead_id = %lead.id, "New lead created");
        }

        let recorded = self
            .ledger
            .record(ProcessedEvent::new(
                message.provider.clone(),
                message.external_message_id.clone(),
                MESSAGE_EVENT_TYPE,
                Some(lead.id),
                now,
            ))
            .await?;
        if recorded == SaveResult::AlreadyExists {
            tracing::debug!(
                lead_id = %lead.id,
                external_id = %message.external_message_id,
                "Duplicate inbound message suppressed"
            );
            return Ok(HandleInboundMessageResult::Duplicate { lead_id: lead.id });
        }

        if let InboundOrdering::OutOfOrder { last_seen } =
            self.leads.record_inbound(&lead.id, now).await?
        {
            tracing::info!(
                lead_id = %lead.id,
                received_at = %now.as_datetime(),
                last_seen = %last_seen.as_datetime(),
                "Out-of-order message discarded"
            );
            return Ok(HandleInboundMessageResult::OutOfOrder { lead_id: lead.id });
        }

        let lead = if lead.status == LeadStatus::Unrecognized {
            tracing::warn!(lead_id = %lead.id, "Recovering lead with unrecognized status");
            self.leads.recover_unrecognized_status(&lead.id, now).await?
        } else {
            lead
        };

        let mut turn = Turn {
            lead,
            text: normalize(&message.text),
            has_media: message.has_media,
            now,
            outbound: Vec::new(),
        };

        let handled_by_keyword = match classify_keyword(&turn.text) {
            Some(keyword) => self.handle_keyword(&mut turn, keyword).await?,
            None => false,
        };
        if !handled_by_keyword {
            self.dispatch(&mut turn).await?;
        }

        Ok(HandleInboundMessageResult::Processed {
            lead_id: turn.lead.id,
            status: turn.lead.status,
            outbound: turn.outbound,
        })
    }

    // ════════════════════════════════════════════════════════════════════
    // Keywords
    // ════════════════════════════════════════════════════════════════════

    /// Returns false when the keyword does not apply in the current status
    /// and the message should be routed normally.
    async fn handle_keyword(&self, turn: &mut Turn, keyword: Keyword) -> Result<bool, LeadError> {
        let status = turn.lead.status;
        match keyword {
            Keyword::OptOut => {
                if status == LeadStatus::OptedOut {
                    return Ok(true);
                }
                if self
                    .transition(turn, LeadStatus::OptedOut, Some(keyword.as_str().to_string()))
                    .await?
                {
                    tracing::info!(lead_id = %turn.lead.id, from = %status, "Lead opted out");
                    turn.reply(copy::OPTED_OUT);
                }
                Ok(true)
            }
            Keyword::Resume if status.is_restartable() => {
                // The inbound ordering guard is left as recorded; see DESIGN.md.
                if self
                    .transition(turn, LeadStatus::New, Some(keyword.as_str().to_string()))
                    .await?
                {
                    tracing::info!(lead_id = %turn.lead.id, from = %status, "Lead restarted");
                    self.start(turn).await?;
                }
                Ok(true)
            }
            Keyword::Continue if status == LeadStatus::NeedsHumanReply => {
                self.resume_paused(turn).await?;
                Ok(true)
            }
            Keyword::HumanRequest if !status.is_closed() && status != LeadStatus::NeedsHumanReply => {
                self.escalate(turn, keyword.as_str().to_string()).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resume_paused(&self, turn: &mut Turn) -> Result<(), LeadError> {
        let target = turn.lead.resume_status();
        let paused_before_start = turn.lead.paused_from == Some(LeadStatus::New);
        if !self.transition(turn, target, None).await? {
            return Ok(());
        }
        tracing::info!(lead_id = %turn.lead.id, status = %target, "Paused conversation resumed");
        if paused_before_start {
            turn.reply(copy::GREETING);
        }

        match target {
            LeadStatus::Qualifying => match turn.lead.current_question() {
                Some(question) => {
                    if let Some(field) = question.parse_field() {
                        self.repair.reset_failure(&turn.lead.id, field).await?;
                    }
                    turn.reply(copy::question_prompt(question));
                }
                None => self.complete(turn).await?,
            },
            LeadStatus::AwaitingSlotSelection => {
                self.repair.reset_failure(&turn.lead.id, ParseField::Slot).await?;
                turn.reply(copy::slot_offer(&turn.lead.offered_slots));
            }
            LeadStatus::TourOffered => turn.reply(copy::TOUR_REPROMPT),
            other => {
                if let Some(info) = copy::status_info(other) {
                    turn.reply(info);
                }
            }
        }
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // Status routing
    // ════════════════════════════════════════════════════════════════════

    async fn dispatch(&self, turn: &mut Turn) -> Result<(), LeadError> {
        match route_for(turn.lead.status) {
            Route::Start => self.start(turn).await,
            Route::Qualify => self.qualify(turn).await,
            Route::Paused => self.holding_reply(turn).await,
            Route::TourResponse => self.tour_response(turn).await,
            Route::SlotSelection => self.slot_selection(turn).await,
            Route::Restartable | Route::Informational => {
                if let Some(info) = copy::status_info(turn.lead.status) {
                    turn.reply(info);
                }
                Ok(())
            }
            // Unrecognized leads are recovered before routing.
            Route::Recover => Ok(()),
        }
    }

    async fn start(&self, turn: &mut Turn) -> Result<(), LeadError> {
        if self.transition(turn, LeadStatus::Qualifying, None).await? {
            turn.reply(copy::GREETING);
            turn.reply(copy::question_prompt(QuestionKey::Idea));
        }
        Ok(())
    }

    async fn qualify(&self, turn: &mut Turn) -> Result<(), LeadError> {
        let Some(question) = turn.lead.current_question() else {
            // Every question answered but completion never committed.
            return self.complete(turn).await;
        };

        if turn.text.is_empty() && !(turn.has_media && question.parse_field().is_none()) {
            turn.reply(copy::EMPTY_ANSWER);
            return Ok(());
        }

        if detect_answer_bundle(&turn.text) {
            tracing::debug!(lead_id = %turn.lead.id, question = %question, "Multi-answer bundle");
            turn.reply(copy::BUNDLE);
            return Ok(());
        }

        match question.parse_field() {
            Some(field) => {
                if parses_as(field, &turn.text) {
                    self.repair.reset_failure(&turn.lead.id, field).await?;
                    self.accept_answer(turn, question).await
                } else {
                    self.parse_failed(turn, field, |turn| {
                        turn.reply(copy::repair_prompt(field));
                    })
                    .await
                }
            }
            None => {
                if let Some(looks_like) = detect_wrong_field(&turn.text) {
                    tracing::debug!(
                        lead_id = %turn.lead.id,
                        question = %question,
                        looks_like = looks_like.as_str(),
                        "Answer looks like a different field"
                    );
                    turn.reply(copy::wrong_field_prompt(question, looks_like));
                    return Ok(());
                }
                self.accept_answer(turn, question).await
            }
        }
    }

    async fn accept_answer(&self, turn: &mut Turn, question: QuestionKey) -> Result<(), LeadError> {
        let text = if turn.text.is_empty() {
            MEDIA_PLACEHOLDER.to_string()
        } else {
            turn.text.clone()
        };
        self.answers
            .append(NewAnswer::new(turn.lead.id, question, text), turn.now)
            .await?;

        match self
            .leads
            .advance_step_if_at(&turn.lead.id, question.step(), turn.now)
            .await?
        {
            StepAdvance::Advanced(lead) => {
                turn.lead = lead;
                match turn.lead.current_question() {
                    Some(next) => turn.reply(copy::question_prompt(next)),
                    None => self.complete(turn).await?,
                }
            }
            StepAdvance::AlreadyAdvanced => {
                tracing::debug!(
                    lead_id = %turn.lead.id,
                    step = question.step(),
                    "Step already advanced by a concurrent message"
                );
            }
        }
        Ok(())
    }

    /// Counts a failure, then either runs `retry` or escalates.
    async fn parse_failed(
        &self,
        turn: &mut Turn,
        field: ParseField,
        retry: impl FnOnce(&mut Turn),
    ) -> Result<(), LeadError> {
        match self.repair.record_failure(&turn.lead.id, field).await? {
            RepairDecision::Retry { failures } => {
                tracing::info!(
                    lead_id = %turn.lead.id,
                    field = field.as_str(),
                    failures,
                    "Parse failed, asking again"
                );
                retry(turn);
                Ok(())
            }
            RepairDecision::Escalate { failures } => {
                tracing::warn!(
                    lead_id = %turn.lead.id,
                    field = field.as_str(),
                    failures,
                    threshold = self.repair.threshold(),
                    "Parse failure threshold reached, handing off"
                );
                self.escalate(turn, field.escalation_reason()).await
            }
        }
    }

    /// Moves the lead to `NeedsHumanReply` and tells both sides.
    async fn escalate(&self, turn: &mut Turn, reason: String) -> Result<(), LeadError> {
        if !self
            .transition(turn, LeadStatus::NeedsHumanReply, Some(reason.clone()))
            .await?
        {
            return Ok(());
        }
        turn.reply(copy::HANDOFF);

        if let Some(artist) = &self.artist_channel {
            let current = self.current_answers(&turn.lead.id).await?;
            let context = HandoffContext::build(&turn.lead, &current, reason);
            turn.outbound
                .push(OutboundMessage::to_artist(artist.clone(), turn.lead.id, context.render()));
        }
        Ok(())
    }

    async fn holding_reply(&self, turn: &mut Turn) -> Result<(), LeadError> {
        let claimed = self
            .leads
            .claim_holding_reply(&turn.lead.id, turn.now, self.config.holding_reply_interval_secs)
            .await?;
        if claimed {
            turn.reply(copy::HOLDING_REPLY);
        } else {
            tracing::debug!(lead_id = %turn.lead.id, "Holding reply rate limited");
        }
        Ok(())
    }

    /// Derives qualification from the latest-wins answers and routes the lead.
    async fn complete(&self, turn: &mut Turn) -> Result<(), LeadError> {
        let current = self.current_answers(&turn.lead.id).await?;
        let qualification = derive_qualification(&current, &self.policy);
        let next = qualification.next_status(&self.policy);

        let update = self
            .leads
            .update_if_matches(
                &turn.lead.id,
                LeadStatus::Qualifying,
                next,
                LeadPatch::new().with_qualification(qualification.clone()),
                None,
                turn.now,
            )
            .await?;

        match update {
            StatusUpdate::Applied(lead) => {
                tracing::info!(
                    lead_id = %lead.id,
                    status = %next,
                    region = qualification.region.as_str(),
                    below_minimum = qualification.budget_below_minimum,
                    "Qualification complete"
                );
                turn.lead = lead;
            }
            StatusUpdate::Mismatch { actual } => {
                tracing::debug!(
                    lead_id = %turn.lead.id,
                    actual = %actual,
                    "Qualification already completed by a concurrent message"
                );
                return Ok(());
            }
        }

        if next == LeadStatus::TourOffered {
            let country = qualification
                .location
                .as_ref()
                .and_then(|l| l.country.as_deref());
            turn.reply(copy::tour_offer(country));
        } else {
            turn.reply(copy::completion_reply(next, self.policy.min_budget_pence));
        }

        if let Some(artist) = &self.artist_channel {
            let summary = build_summary(&turn.lead, &current, &qualification);
            turn.outbound
                .push(OutboundMessage::to_artist(artist.clone(), turn.lead.id, summary));
        }
        Ok(())
    }

    async fn tour_response(&self, turn: &mut Turn) -> Result<(), LeadError> {
        match parse_yes_no(&turn.text) {
            Some(true) => {
                if self.transition(turn, LeadStatus::PendingApproval, None).await? {
                    turn.reply(copy::TOUR_ACCEPTED);
                    self.notify_artist(turn, "accepted a guest spot offer");
                }
            }
            Some(false) => {
                if self.transition(turn, LeadStatus::Waitlisted, None).await? {
                    turn.reply(copy::TOUR_DECLINED);
                }
            }
            None => turn.reply(copy::TOUR_REPROMPT),
        }
        Ok(())
    }

    async fn slot_selection(&self, turn: &mut Turn) -> Result<(), LeadError> {
        let slots = turn.lead.offered_slots.clone();
        match parse_slot_selection(&turn.text, &slots, slots.len()) {
            Ok(index) => {
                let Some(slot) = slots.get(index - 1).copied() else {
                    return Ok(());
                };
                self.repair.reset_failure(&turn.lead.id, ParseField::Slot).await?;

                let update = self
                    .leads
                    .update_if_matches(
                        &turn.lead.id,
                        LeadStatus::AwaitingSlotSelection,
                        LeadStatus::BookingPending,
                        LeadPatch::new().with_selected_slot(slot),
                        None,
                        turn.now,
                    )
                    .await?;
                match update {
                    StatusUpdate::Applied(lead) => {
                        turn.lead = lead;
                        turn.reply(copy::slot_confirmed(&slot));
                        self.notify_artist(turn, &format!("picked slot {}", slot.label()));
                    }
                    StatusUpdate::Mismatch { actual } => {
                        tracing::debug!(
                            lead_id = %turn.lead.id,
                            actual = %actual,
                            "Slot already selected by a concurrent message"
                        );
                    }
                }
                Ok(())
            }
            Err(rejection) => {
                tracing::info!(
                    lead_id = %turn.lead.id,
                    reason = rejection.as_str(),
                    "Slot selection rejected"
                );
                self.parse_failed(turn, ParseField::Slot, |turn| {
                    turn.reply(copy::repair_prompt(ParseField::Slot));
                })
                .await
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════

    /// Locked transition. Returns false when a concurrent writer moved the
    /// lead somewhere this move is no longer legal from.
    async fn transition(
        &self,
        turn: &mut Turn,
        to: LeadStatus,
        reason: Option<String>,
    ) -> Result<bool, LeadError> {
        match self
            .leads
            .transition(&turn.lead, to, reason, RowLock::Exclusive, turn.now)
            .await
        {
            Ok(lead) => {
                turn.lead = lead;
                Ok(true)
            }
            Err(err) if err.is_concurrency_loss() => {
                tracing::debug!(lead_id = %turn.lead.id, to = %to, error = %err, "Transition lost race");
                Ok(false)
            }
            Err(err) => {
                if matches!(err, LeadError::InvalidTransition { .. }) {
                    tracing::error!(lead_id = %turn.lead.id, error = %err, "Illegal transition requested");
                }
                Err(err)
            }
        }
    }

    async fn current_answers(&self, lead_id: &LeadId) -> Result<CurrentAnswers, LeadError> {
        let rows = self.answers.list_for_lead(lead_id).await?;
        Ok(CurrentAnswers::from_answers(&rows))
    }

    fn notify_artist(&self, turn: &mut Turn, what: &str) {
        if let Some(artist) = &self.artist_channel {
            let text = format!("Lead {} ({}) {}", turn.lead.id, turn.lead.channel_id, what);
            turn.outbound
                .push(OutboundMessage::to_artist(artist.clone(), turn.lead.id, text));
        }
    }
}

fn parses_as(field: ParseField, text: &str) -> bool {
    match field {
        ParseField::Dimensions => parse_dimensions(text).is_some(),
        ParseField::Budget => parse_budget(text).is_some(),
        ParseField::Location => parse_location(text).is_some(),
        // Slots are parsed against the offered list, never at a question step.
        ParseField::Slot => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryLeadStore, InMemoryProcessedEventStore};
    use crate::domain::conversation::{Audience, WHATSAPP_PROVIDER};
    use crate::domain::parsing::TimeSlot;
    use chrono::{FixedOffset, TimeZone};

    const CLIENT: &str = "+447700900123";
    const ARTIST: &str = "+447700900999";

    struct Harness {
        store: Arc<InMemoryLeadStore>,
        ledger: Arc<InMemoryProcessedEventStore>,
        handler: HandleInboundMessageHandler,
        clock: Timestamp,
        next_id: u32,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(ConversationConfig {
                artist_channel: Some(ARTIST.to_string()),
                tour_countries: vec!["Germany".to_string()],
                ..Default::default()
            })
        }

        fn with_config(config: ConversationConfig) -> Self {
            let store = Arc::new(InMemoryLeadStore::new());
            let ledger = Arc::new(InMemoryProcessedEventStore::new());
            let handler = HandleInboundMessageHandler::new(
                store.clone(),
                store.clone(),
                ledger.clone(),
                config,
                FeatureFlags::default(),
            );
            Self {
                store,
                ledger,
                handler,
                clock: Timestamp::now(),
                next_id: 0,
            }
        }

        fn message(&mut self, text: &str) -> InboundMessage {
            self.next_id += 1;
            self.clock = self.clock.plus_secs(5);
            InboundMessage::new(
                WHATSAPP_PROVIDER,
                format!("wamid.{}", self.next_id),
                ChannelId::new(CLIENT).unwrap(),
                text,
                self.clock,
            )
        }

        async fn send(&mut self, text: &str) -> HandleInboundMessageResult {
            let message = self.message(text);
            self.handler
                .handle(HandleInboundMessageCommand { message })
                .await
                .unwrap()
        }

        async fn lead(&self) -> Lead {
            self.store
                .find_by_channel(&ChannelId::new(CLIENT).unwrap())
                .await
                .unwrap()
                .unwrap()
        }

        /// Answers up to and including `last`.
        async fn answer_through(&mut self, last: QuestionKey) {
            let answers = [
                (QuestionKey::Idea, "a swallow with roses"),
                (QuestionKey::Placement, "left forearm"),
                (QuestionKey::Dimensions, "10x15cm"),
                (QuestionKey::Style, "traditional"),
                (QuestionKey::Budget, "£400"),
                (QuestionKey::Location, "Leeds, UK"),
                (QuestionKey::Timing, "sometime in spring"),
            ];
            for (key, text) in answers {
                self.send(text).await;
                if key == last {
                    break;
                }
            }
        }
    }

    fn client_texts(result: &HandleInboundMessageResult) -> Vec<String> {
        result
            .outbound()
            .iter()
            .filter(|m| m.audience == Audience::Client)
            .map(|m| m.text.clone())
            .collect()
    }

    // ════════════════════════════════════════════════════════════════════
    // Start and qualification
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_message_greets_and_asks_first_question() {
        let mut h = Harness::new();
        let result = h.send("hi there").await;

        assert_eq!(
            client_texts(&result),
            vec![
                copy::GREETING.to_string(),
                copy::question_prompt(QuestionKey::Idea).to_string()
            ]
        );
        assert_eq!(h.lead().await.status, LeadStatus::Qualifying);
    }

    #[tokio::test]
    async fn valid_answer_advances_one_step() {
        let mut h = Harness::new();
        h.send("hi").await;
        let result = h.send("a swallow with roses").await;

        assert_eq!(
            client_texts(&result),
            vec![copy::question_prompt(QuestionKey::Placement).to_string()]
        );
        assert_eq!(h.lead().await.current_step, 1);
    }

    #[tokio::test]
    async fn full_qualification_routes_to_pending_approval_and_notifies_artist() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Location).await;
        let result = h.send("sometime in spring").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::PendingApproval);
        assert!(lead.qualification.is_some());
        assert!(result
            .outbound()
            .iter()
            .any(|m| m.audience == Audience::Artist && m.text.contains("New lead")));
    }

    #[tokio::test]
    async fn low_budget_routes_to_follow_up() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Style).await;
        h.send("£50").await;
        h.send("Leeds, UK").await;
        h.send("next month").await;

        assert_eq!(h.lead().await.status, LeadStatus::NeedsFollowUp);
    }

    #[tokio::test]
    async fn touring_country_gets_tour_offer_then_accepts() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Budget).await;
        h.send("Berlin, Germany").await;
        let offer = h.send("summer").await;
        assert_eq!(h.lead().await.status, LeadStatus::TourOffered);
        assert!(client_texts(&offer)[0].contains("Germany"));

        h.send("maybe").await;
        assert_eq!(h.lead().await.status, LeadStatus::TourOffered);

        let accepted = h.send("yes please").await;
        assert_eq!(client_texts(&accepted), vec![copy::TOUR_ACCEPTED.to_string()]);
        assert_eq!(h.lead().await.status, LeadStatus::PendingApproval);
    }

    // ════════════════════════════════════════════════════════════════════
    // Guards
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn wrong_field_at_free_text_step_reprompts_without_counting() {
        let mut h = Harness::new();
        h.send("hi").await;
        let result = h.send("£400").await;

        assert!(client_texts(&result)[0].contains("budget"));
        let lead = h.lead().await;
        assert_eq!(lead.current_step, 0);
        assert_eq!(lead.parse_failures, Default::default());
    }

    #[tokio::test]
    async fn answer_bundle_asks_one_at_a_time() {
        let mut h = Harness::new();
        h.send("hi").await;
        let result = h.send("a rose, 10x15cm, £300").await;

        assert_eq!(client_texts(&result), vec![copy::BUNDLE.to_string()]);
        assert_eq!(h.lead().await.current_step, 0);
    }

    #[tokio::test]
    async fn media_only_answer_is_accepted_for_free_text() {
        let mut h = Harness::new();
        h.send("hi").await;
        let message = h.message("").with_media();
        h.handler
            .handle(HandleInboundMessageCommand { message })
            .await
            .unwrap();

        assert_eq!(h.lead().await.current_step, 1);
    }

    // ════════════════════════════════════════════════════════════════════
    // Repair and escalation
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn below_threshold_sends_repair_prompt_and_keeps_status() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Style).await;

        h.send("not sure").await;
        let second = h.send("whatever works").await;

        assert_eq!(
            client_texts(&second),
            vec![copy::repair_prompt(ParseField::Budget).to_string()]
        );
        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(lead.parse_failures.get(ParseField::Budget), 2);
    }

    #[tokio::test]
    async fn threshold_failures_hand_off_with_reason() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Style).await;

        h.send("not sure").await;
        h.send("whatever works").await;
        let third = h.send("depends").await;

        assert_eq!(client_texts(&third), vec![copy::HANDOFF.to_string()]);
        assert!(third
            .outbound()
            .iter()
            .any(|m| m.audience == Audience::Artist && m.text.contains("parse_failure:budget")));
        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::NeedsHumanReply);
        assert_eq!(lead.status_reason.as_deref(), Some("parse_failure:budget"));
        assert_eq!(lead.paused_from, Some(LeadStatus::Qualifying));
    }

    #[tokio::test]
    async fn successful_parse_resets_counter() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Placement).await;
        h.send("big").await;
        h.send("10x10cm").await;

        assert_eq!(h.lead().await.parse_failures.get(ParseField::Dimensions), 0);
    }

    #[tokio::test]
    async fn paused_lead_gets_rate_limited_holding_reply() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.send("I want to talk to a human").await;
        assert_eq!(h.lead().await.status, LeadStatus::NeedsHumanReply);

        let first = h.send("hello?").await;
        let second = h.send("anyone there?").await;

        assert_eq!(client_texts(&first), vec![copy::HOLDING_REPLY.to_string()]);
        assert!(second.outbound().is_empty());
    }

    #[tokio::test]
    async fn continue_resumes_at_same_step() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Style).await;
        for text in ["not sure", "whatever", "depends"] {
            h.send(text).await;
        }

        let result = h.send("continue").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(lead.current_question(), Some(QuestionKey::Budget));
        assert_eq!(lead.parse_failures.get(ParseField::Budget), 0);
        assert_eq!(
            client_texts(&result),
            vec![copy::question_prompt(QuestionKey::Budget).to_string()]
        );
    }

    #[tokio::test]
    async fn continue_after_handoff_on_first_message_starts_qualifying() {
        let mut h = Harness::new();
        let first = h.send("can I talk to a human").await;
        assert!(matches!(
            first,
            HandleInboundMessageResult::Processed {
                status: LeadStatus::NeedsHumanReply,
                ..
            }
        ));
        assert_eq!(h.lead().await.paused_from, Some(LeadStatus::New));

        let result = h.send("continue").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(lead.current_question(), Some(QuestionKey::Idea));
        assert_eq!(
            client_texts(&result),
            vec![
                copy::GREETING.to_string(),
                copy::question_prompt(QuestionKey::Idea).to_string()
            ]
        );
    }

    // ════════════════════════════════════════════════════════════════════
    // Keywords
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn opt_out_wins_over_everything() {
        let mut h = Harness::new();
        h.send("hi").await;
        let result = h.send("STOP").await;

        assert_eq!(client_texts(&result), vec![copy::OPTED_OUT.to_string()]);
        assert_eq!(h.lead().await.status, LeadStatus::OptedOut);

        let after = h.send("hello again").await;
        assert!(after.outbound().is_empty());
    }

    #[tokio::test]
    async fn resume_restarts_from_first_question() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Placement).await;
        h.send("stop").await;

        let result = h.send("start").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(lead.current_step, 0);
        assert_eq!(
            client_texts(&result),
            vec![
                copy::GREETING.to_string(),
                copy::question_prompt(QuestionKey::Idea).to_string()
            ]
        );
    }

    // ════════════════════════════════════════════════════════════════════
    // Idempotency and ordering
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_delivery_is_a_no_op() {
        let mut h = Harness::new();
        h.send("hi").await;
        let message = h.message("a swallow");

        let first = h
            .handler
            .handle(HandleInboundMessageCommand { message: message.clone() })
            .await
            .unwrap();
        let second = h
            .handler
            .handle(HandleInboundMessageCommand { message })
            .await
            .unwrap();

        assert!(matches!(first, HandleInboundMessageResult::Processed { .. }));
        assert!(matches!(second, HandleInboundMessageResult::Duplicate { .. }));
        assert_eq!(h.lead().await.current_step, 1);
        assert_eq!(h.ledger.len().await, 2);
    }

    #[tokio::test]
    async fn older_message_is_discarded_without_side_effects() {
        let mut h = Harness::new();
        h.send("hi").await;
        h.answer_through(QuestionKey::Style).await;
        h.send("no idea").await;
        let before = h.lead().await;

        let mut stale = h.message("£400");
        stale.received_at = before.last_client_message_at.unwrap().minus_secs(60);
        let result = h
            .handler
            .handle(HandleInboundMessageCommand { message: stale })
            .await
            .unwrap();

        assert!(matches!(result, HandleInboundMessageResult::OutOfOrder { .. }));
        assert!(result.outbound().is_empty());
        let after = h.lead().await;
        assert_eq!(after.current_step, before.current_step);
        assert_eq!(after.parse_failures, before.parse_failures);
        assert_eq!(after.status, before.status);
    }

    #[tokio::test]
    async fn unrecognized_status_is_recovered_and_restarted() {
        let mut h = Harness::new();
        h.send("hi").await;
        let lead = h.lead().await;
        h.store.corrupt_status(&lead.id).await;

        let result = h.send("hello").await;

        assert_eq!(h.lead().await.status, LeadStatus::Qualifying);
        assert_eq!(client_texts(&result)[0], copy::GREETING);
    }

    // ════════════════════════════════════════════════════════════════════
    // Slot selection
    // ════════════════════════════════════════════════════════════════════

    fn slots() -> Vec<TimeSlot> {
        let tz = FixedOffset::east_opt(0).unwrap();
        let start = |d, h| tz.with_ymd_and_hms(2026, 11, d, h, 0, 0).unwrap();
        vec![
            TimeSlot::new(start(2, 10), start(2, 13)),
            TimeSlot::new(start(3, 14), start(3, 17)),
        ]
    }

    async fn awaiting_slot(h: &mut Harness) -> Lead {
        h.send("hi").await;
        let mut lead = h.lead().await;
        lead.status = LeadStatus::AwaitingSlotSelection;
        lead.offered_slots = slots();
        h.store.insert(lead.clone()).await;
        lead
    }

    #[tokio::test]
    async fn slot_number_selects_slot() {
        let mut h = Harness::new();
        awaiting_slot(&mut h).await;

        let result = h.send("2").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::BookingPending);
        assert_eq!(lead.selected_slot, Some(slots()[1]));
        assert!(client_texts(&result)[0].starts_with(copy::SLOT_CONFIRMED_PREFIX));
    }

    #[tokio::test]
    async fn ambiguous_slot_reply_is_repaired_not_guessed() {
        let mut h = Harness::new();
        awaiting_slot(&mut h).await;

        let result = h.send("1 or 2").await;

        let lead = h.lead().await;
        assert_eq!(lead.status, LeadStatus::AwaitingSlotSelection);
        assert_eq!(lead.parse_failures.get(ParseField::Slot), 1);
        assert_eq!(
            client_texts(&result),
            vec![copy::repair_prompt(ParseField::Slot).to_string()]
        );
    }

    #[tokio::test]
    async fn lower_threshold_escalates_sooner() {
        let mut h = Harness::with_config(ConversationConfig {
            parse_failure_threshold: 2,
            ..Default::default()
        });
        h.send("hi").await;
        h.answer_through(QuestionKey::Placement).await;

        h.send("big").await;
        assert_eq!(h.lead().await.status, LeadStatus::Qualifying);
        h.send("quite big").await;
        assert_eq!(h.lead().await.status, LeadStatus::NeedsHumanReply);
    }
}
