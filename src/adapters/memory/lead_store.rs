//! In-memory lead and answer storage.
//!
//! One async mutex guards all state, so every operation is atomic and
//! the row-lock and CAS primitives behave exactly as the database ones
//! do. Used by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{
    AnswerId, ChannelId, DomainError, ErrorCode, LeadId, StateMachine, Timestamp,
};
use crate::domain::lead::{
    check_transition, Answer, Lead, LeadError, LeadPatch, LeadStatus, NewAnswer, ParseField,
};
use crate::ports::{
    AnswerRepository, InboundOrdering, LeadRepository, RowLock, StatusUpdate, StepAdvance,
};

#[derive(Default)]
struct State {
    leads: HashMap<LeadId, Lead>,
    by_channel: HashMap<ChannelId, LeadId>,
    answers: Vec<Answer>,
    next_answer_id: i64,
}

impl State {
    fn lead_mut(&mut self, id: &LeadId) -> Result<&mut Lead, DomainError> {
        self.leads
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::LeadNotFound, format!("Lead not found: {}", id)))
    }
}

/// In-memory implementation of [`LeadRepository`] and [`AnswerRepository`].
#[derive(Default)]
pub struct InMemoryLeadStore {
    state: Mutex<State>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Stores a lead as-is, replacing any lead with the same id.
    pub async fn insert(&self, lead: Lead) {
        let mut state = self.state.lock().await;
        state.by_channel.insert(lead.channel_id.clone(), lead.id);
        state.leads.insert(lead.id, lead);
    }

    /// Simulates a stored status value that no longer parses.
    pub async fn corrupt_status(&self, id: &LeadId) {
        let mut state = self.state.lock().await;
        if let Some(lead) = state.leads.get_mut(id) {
            lead.status = LeadStatus::Unrecognized;
        }
    }

    pub async fn answer_count(&self, lead_id: &LeadId) -> usize {
        let state = self.state.lock().await;
        state.answers.iter().filter(|a| a.lead_id == *lead_id).count()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadStore {
    async fn get_or_create(
        &self,
        channel_id: &ChannelId,
        now: Timestamp,
    ) -> Result<(Lead, bool), DomainError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.by_channel.get(channel_id).copied() {
            if let Some(lead) = state.leads.get(&id) {
                return Ok((lead.clone(), false));
            }
        }
        let lead = Lead::new(channel_id.clone(), now);
        state.by_channel.insert(channel_id.clone(), lead.id);
        state.leads.insert(lead.id, lead.clone());
        Ok((lead, true))
    }

    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, DomainError> {
        Ok(self.state.lock().await.leads.get(id).cloned())
    }

    async fn find_by_channel(&self, channel_id: &ChannelId) -> Result<Option<Lead>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .by_channel
            .get(channel_id)
            .and_then(|id| state.leads.get(id))
            .cloned())
    }

    async fn transition(
        &self,
        lead: &Lead,
        to: LeadStatus,
        reason: Option<String>,
        lock: RowLock,
        now: Timestamp,
    ) -> Result<Lead, LeadError> {
        check_transition(lead.status, to)?;

        let mut state = self.state.lock().await;
        let stored = state
            .leads
            .get_mut(&lead.id)
            .ok_or(LeadError::NotFound(lead.id))?;

        let moved = stored.status != lead.status;
        let still_legal = stored.status.can_transition_to(&to);
        match lock {
            RowLock::Exclusive if moved && !still_legal => {
                return Err(LeadError::status_changed(lead.status, stored.status));
            }
            RowLock::Unlocked if moved => {
                return Err(LeadError::status_changed(lead.status, stored.status));
            }
            _ => {}
        }

        stored.transition_to(to, reason, now)?;
        Ok(stored.clone())
    }

    async fn advance_step_if_at(
        &self,
        id: &LeadId,
        expected_step: u32,
        now: Timestamp,
    ) -> Result<StepAdvance, DomainError> {
        let mut state = self.state.lock().await;
        let lead = state.lead_mut(id)?;
        if lead.current_step != expected_step {
            return Ok(StepAdvance::AlreadyAdvanced);
        }
        lead.current_step += 1;
        lead.updated_at = now;
        Ok(StepAdvance::Advanced(lead.clone()))
    }

    async fn update_if_matches(
        &self,
        id: &LeadId,
        expected: LeadStatus,
        new_status: LeadStatus,
        patch: LeadPatch,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<StatusUpdate, LeadError> {
        check_transition(expected, new_status)?;

        let mut state = self.state.lock().await;
        let lead = state.leads.get_mut(id).ok_or(LeadError::NotFound(*id))?;
        if lead.status != expected {
            return Ok(StatusUpdate::Mismatch {
                actual: lead.status,
            });
        }
        lead.transition_to(new_status, reason, now)?;
        lead.apply_patch(&patch);
        Ok(StatusUpdate::Applied(lead.clone()))
    }

    async fn record_inbound(&self, id: &LeadId, at: Timestamp) -> Result<InboundOrdering, DomainError> {
        let mut state = self.state.lock().await;
        let lead = state.lead_mut(id)?;
        if let Some(last_seen) = lead.last_client_message_at {
            if at.is_before(&last_seen) {
                return Ok(InboundOrdering::OutOfOrder { last_seen });
            }
        }
        lead.last_client_message_at = Some(at);
        Ok(InboundOrdering::InOrder)
    }

    async fn record_outbound(&self, id: &LeadId, at: Timestamp) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.lead_mut(id)?.last_outbound_message_at = Some(at);
        Ok(())
    }

    async fn claim_holding_reply(
        &self,
        id: &LeadId,
        now: Timestamp,
        min_interval_secs: i64,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        let lead = state.lead_mut(id)?;
        if let Some(last) = lead.last_holding_reply_at {
            if now.duration_since(&last).num_seconds() < min_interval_secs {
                return Ok(false);
            }
        }
        lead.last_holding_reply_at = Some(now);
        Ok(true)
    }

    async fn increment_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<u32, DomainError> {
        let mut state = self.state.lock().await;
        Ok(state.lead_mut(id)?.parse_failures.increment(field))
    }

    async fn reset_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.lead_mut(id)?.parse_failures.reset(field);
        Ok(())
    }

    async fn find_inactive(
        &self,
        statuses: &[LeadStatus],
        silent_since: Timestamp,
    ) -> Result<Vec<Lead>, DomainError> {
        let state = self.state.lock().await;
        let mut leads: Vec<Lead> = state
            .leads
            .values()
            .filter(|l| statuses.contains(&l.status))
            .filter(|l| l.last_client_message_at.unwrap_or(l.created_at).is_before(&silent_since))
            .cloned()
            .collect();
        leads.sort_by_key(|l| l.created_at);
        Ok(leads)
    }

    async fn recover_unrecognized_status(&self, id: &LeadId, now: Timestamp) -> Result<Lead, DomainError> {
        let mut state = self.state.lock().await;
        let lead = state.lead_mut(id)?;
        if lead.status != LeadStatus::Unrecognized {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Lead {} has a readable status: {}", id, lead.status),
            ));
        }
        // Deliberately bypasses the transition table.
        lead.status = LeadStatus::New;
        lead.status_reason = Some("recovered_unrecognized_status".to_string());
        lead.paused_from = None;
        lead.current_step = 0;
        lead.parse_failures.clear();
        lead.phase_entered_at.insert(LeadStatus::New, now);
        lead.updated_at = now;
        Ok(lead.clone())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryLeadStore {
    async fn append(&self, answer: NewAnswer, created_at: Timestamp) -> Result<Answer, DomainError> {
        let mut state = self.state.lock().await;
        state.next_answer_id += 1;
        let stored = Answer {
            id: AnswerId::new(state.next_answer_id),
            lead_id: answer.lead_id,
            question_key: answer.question_key,
            text: answer.text,
            created_at,
        };
        state.answers.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Answer>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .answers
            .iter()
            .filter(|a| a.lead_id == *lead_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::{CurrentAnswers, QuestionKey};
    use std::sync::Arc;

    fn channel() -> ChannelId {
        ChannelId::new("+447700900123").unwrap()
    }

    async fn qualifying_lead(store: &InMemoryLeadStore) -> Lead {
        let (lead, _) = store.get_or_create(&channel(), Timestamp::now()).await.unwrap();
        store
            .transition(&lead, LeadStatus::Qualifying, None, RowLock::Exclusive, Timestamp::now())
            .await
            .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn get_or_create_returns_same_lead_for_channel() {
        let store = InMemoryLeadStore::new();
        let (first, created) = store.get_or_create(&channel(), Timestamp::now()).await.unwrap();
        let (second, created_again) = store.get_or_create(&channel(), Timestamp::now()).await.unwrap();
        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, second.id);
    }

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn illegal_transition_leaves_status_unchanged() {
        let store = InMemoryLeadStore::new();
        let (lead, _) = store.get_or_create(&channel(), Timestamp::now()).await.unwrap();

        let err = store
            .transition(&lead, LeadStatus::Booked, None, RowLock::Exclusive, Timestamp::now())
            .await
            .unwrap_err();

        assert_eq!(err, LeadError::invalid_transition(LeadStatus::New, LeadStatus::Booked));
        let stored = store.find_by_id(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::New);
    }

    #[tokio::test]
    async fn locked_transition_fails_when_status_moved_to_incompatible_state() {
        let store = InMemoryLeadStore::new();
        let stale_view = qualifying_lead(&store).await;
        store
            .transition(
                &stale_view,
                LeadStatus::NeedsHumanReply,
                None,
                RowLock::Exclusive,
                Timestamp::now(),
            )
            .await
            .unwrap();

        let err = store
            .transition(
                &stale_view,
                LeadStatus::NeedsHumanReply,
                None,
                RowLock::Exclusive,
                Timestamp::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LeadError::status_changed(LeadStatus::Qualifying, LeadStatus::NeedsHumanReply)
        );
    }

    #[tokio::test]
    async fn locked_transition_revalidates_against_fresh_status() {
        let store = InMemoryLeadStore::new();
        let stale_view = qualifying_lead(&store).await;
        store
            .transition(
                &stale_view,
                LeadStatus::NeedsHumanReply,
                None,
                RowLock::Exclusive,
                Timestamp::now(),
            )
            .await
            .unwrap();

        // Opt-out is legal from both the observed and the fresh status.
        let lead = store
            .transition(&stale_view, LeadStatus::OptedOut, None, RowLock::Exclusive, Timestamp::now())
            .await
            .unwrap();
        assert_eq!(lead.status, LeadStatus::OptedOut);
    }

    #[tokio::test]
    async fn unlocked_transition_requires_observed_status() {
        let store = InMemoryLeadStore::new();
        let stale_view = qualifying_lead(&store).await;
        store
            .transition(&stale_view, LeadStatus::NeedsHumanReply, None, RowLock::Unlocked, Timestamp::now())
            .await
            .unwrap();

        let err = store
            .transition(&stale_view, LeadStatus::OptedOut, None, RowLock::Unlocked, Timestamp::now())
            .await
            .unwrap_err();
        assert!(err.is_concurrency_loss());
    }

    // ══════════════════════════════════════════════════════════════
    // CAS primitives
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn concurrent_step_advance_applies_once() {
        let store = Arc::new(InMemoryLeadStore::new());
        let lead = qualifying_lead(&store).await;

        let a = {
            let store = store.clone();
            let id = lead.id;
            tokio::spawn(async move { store.advance_step_if_at(&id, 0, Timestamp::now()).await })
        };
        let b = {
            let store = store.clone();
            let id = lead.id;
            tokio::spawn(async move { store.advance_step_if_at(&id, 0, Timestamp::now()).await })
        };
        let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];

        let advanced = results
            .iter()
            .filter(|r| matches!(r, StepAdvance::Advanced(_)))
            .count();
        assert_eq!(advanced, 1);
        assert!(results.contains(&StepAdvance::AlreadyAdvanced));
        let stored = store.find_by_id(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.current_step, 1);
    }

    #[tokio::test]
    async fn status_cas_reports_actual_status_on_mismatch() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;

        let result = store
            .update_if_matches(
                &lead.id,
                LeadStatus::AwaitingDeposit,
                LeadStatus::DepositPaid,
                LeadPatch::new(),
                None,
                Timestamp::now(),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            StatusUpdate::Mismatch {
                actual: LeadStatus::Qualifying
            }
        );
    }

    #[tokio::test]
    async fn status_cas_rejects_illegal_pairs_before_touching_storage() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;

        let err = store
            .update_if_matches(
                &lead.id,
                LeadStatus::Qualifying,
                LeadStatus::Booked,
                LeadPatch::new(),
                None,
                Timestamp::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LeadError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn inbound_ordering_rejects_older_messages() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;
        let t1 = Timestamp::now();

        assert_eq!(store.record_inbound(&lead.id, t1).await.unwrap(), InboundOrdering::InOrder);
        assert_eq!(
            store.record_inbound(&lead.id, t1.minus_secs(30)).await.unwrap(),
            InboundOrdering::OutOfOrder { last_seen: t1 }
        );
        // Same timestamp is not out of order.
        assert_eq!(store.record_inbound(&lead.id, t1).await.unwrap(), InboundOrdering::InOrder);
    }

    #[tokio::test]
    async fn holding_reply_is_rate_limited() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;
        let t0 = Timestamp::now();

        assert!(store.claim_holding_reply(&lead.id, t0, 3600).await.unwrap());
        assert!(!store.claim_holding_reply(&lead.id, t0.plus_secs(60), 3600).await.unwrap());
        assert!(store.claim_holding_reply(&lead.id, t0.plus_secs(3600), 3600).await.unwrap());
    }

    #[tokio::test]
    async fn parse_failure_counters_increment_and_reset() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;

        assert_eq!(store.increment_parse_failure(&lead.id, ParseField::Budget).await.unwrap(), 1);
        assert_eq!(store.increment_parse_failure(&lead.id, ParseField::Budget).await.unwrap(), 2);
        store.reset_parse_failure(&lead.id, ParseField::Budget).await.unwrap();
        assert_eq!(store.increment_parse_failure(&lead.id, ParseField::Budget).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recovery_resets_unrecognized_lead() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;
        store.advance_step_if_at(&lead.id, 0, Timestamp::now()).await.unwrap();
        store.corrupt_status(&lead.id).await;

        let recovered = store
            .recover_unrecognized_status(&lead.id, Timestamp::now())
            .await
            .unwrap();

        assert_eq!(recovered.status, LeadStatus::New);
        assert_eq!(recovered.current_step, 0);
    }

    #[tokio::test]
    async fn recovery_refuses_readable_status() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;

        let err = store
            .recover_unrecognized_status(&lead.id, Timestamp::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[tokio::test]
    async fn answers_resolve_latest_wins() {
        let store = InMemoryLeadStore::new();
        let lead = qualifying_lead(&store).await;
        let t0 = Timestamp::now();
        store
            .append(NewAnswer::new(lead.id, QuestionKey::Budget, "£400"), t0)
            .await
            .unwrap();
        store
            .append(NewAnswer::new(lead.id, QuestionKey::Budget, "£500"), t0)
            .await
            .unwrap();

        let rows = store.list_for_lead(&lead.id).await.unwrap();
        let current = CurrentAnswers::from_answers(&rows);
        assert_eq!(current.get(QuestionKey::Budget), Some("£500"));
    }
}
