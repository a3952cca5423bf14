//! ResumeFromHandoffHandler - The studio hands a paused conversation back.
//!
//! Returns the lead to the status it paused from (qualification when
//! unknown, or when it paused before the first question) and re-asks
//! whatever was pending there. The repair counter
//! of the pending field starts again from zero.

use std::sync::Arc;

use super::{compare_and_set, load_in, AdminActionResult};
use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{Lead, LeadError, LeadPatch, LeadStatus, ParseField};
use crate::ports::LeadRepository;

#[derive(Debug, Clone)]
pub struct ResumeFromHandoffCommand {
    pub lead_id: LeadId,
}

pub struct ResumeFromHandoffHandler {
    leads: Arc<dyn LeadRepository>,
}

impl ResumeFromHandoffHandler {
    pub fn new(leads: Arc<dyn LeadRepository>) -> Self {
        Self { leads }
    }

    pub async fn handle(
        &self,
        cmd: ResumeFromHandoffCommand,
        now: Timestamp,
    ) -> Result<AdminActionResult, LeadError> {
        let paused = load_in(
            self.leads.as_ref(),
            &cmd.lead_id,
            &[LeadStatus::NeedsHumanReply],
            LeadStatus::Qualifying,
        )
        .await?;
        let to = paused.resume_status();
        let paused_before_start = paused.paused_from == Some(LeadStatus::New);

        let lead = match compare_and_set(self.leads.as_ref(), &paused, to, LeadPatch::new(), None, now).await? {
            Ok(lead) => lead,
            Err(actual) => return Ok(AdminActionResult::AlreadyMoved { actual }),
        };

        if let Some(field) = pending_field(&lead) {
            self.leads.reset_parse_failure(&lead.id, field).await?;
        }

        let text = match to {
            LeadStatus::Qualifying => lead.current_question().map(|q| copy::question_prompt(q).to_string()),
            LeadStatus::AwaitingSlotSelection => Some(copy::slot_offer(&lead.offered_slots)),
            LeadStatus::TourOffered => Some(copy::TOUR_REPROMPT.to_string()),
            other => copy::status_info(other).map(str::to_string),
        };
        let greeting = paused_before_start.then(|| copy::GREETING.to_string());
        let outbound = greeting
            .into_iter()
            .chain(text)
            .map(|text| OutboundMessage::to_client(lead.id, lead.channel_id.clone(), text))
            .collect();

        Ok(AdminActionResult::Applied { lead, outbound })
    }
}

fn pending_field(lead: &Lead) -> Option<ParseField> {
    match lead.status {
        LeadStatus::Qualifying => lead.current_question().and_then(|q| q.parse_field()),
        LeadStatus::AwaitingSlotSelection => Some(ParseField::Slot),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLeadStore;
    use crate::application::handlers::admin::test_support::lead_in;
    use crate::domain::lead::QuestionKey;

    #[tokio::test]
    async fn returns_to_paused_step_with_fresh_counter() {
        let store = Arc::new(InMemoryLeadStore::new());
        let mut lead = lead_in(&store, LeadStatus::NeedsHumanReply).await;
        lead.paused_from = Some(LeadStatus::Qualifying);
        lead.current_step = QuestionKey::Budget.step();
        store.insert(lead.clone()).await;
        for _ in 0..3 {
            store.increment_parse_failure(&lead.id, ParseField::Budget).await.unwrap();
        }
        let handler = ResumeFromHandoffHandler::new(store.clone());

        let result = handler
            .handle(ResumeFromHandoffCommand { lead_id: lead.id }, Timestamp::now())
            .await
            .unwrap();

        let AdminActionResult::Applied { lead, outbound } = result else {
            panic!("expected Applied");
        };
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(lead.paused_from, None);
        assert_eq!(outbound[0].text, copy::question_prompt(QuestionKey::Budget));

        let stored = store.find_by_id(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.parse_failures.get(ParseField::Budget), 0);
    }

    #[tokio::test]
    async fn unknown_pause_origin_falls_back_to_qualifying() {
        let store = Arc::new(InMemoryLeadStore::new());
        let lead = lead_in(&store, LeadStatus::NeedsHumanReply).await;
        let handler = ResumeFromHandoffHandler::new(store);

        let result = handler
            .handle(ResumeFromHandoffCommand { lead_id: lead.id }, Timestamp::now())
            .await
            .unwrap();

        let AdminActionResult::Applied { lead, .. } = result else {
            panic!("expected Applied");
        };
        assert_eq!(lead.status, LeadStatus::Qualifying);
    }

    #[tokio::test]
    async fn lead_paused_before_first_question_starts_qualifying() {
        let store = Arc::new(InMemoryLeadStore::new());
        let mut lead = lead_in(&store, LeadStatus::NeedsHumanReply).await;
        lead.paused_from = Some(LeadStatus::New);
        lead.current_step = 0;
        store.insert(lead.clone()).await;
        let handler = ResumeFromHandoffHandler::new(store);

        let result = handler
            .handle(ResumeFromHandoffCommand { lead_id: lead.id }, Timestamp::now())
            .await
            .unwrap();

        let AdminActionResult::Applied { lead, outbound } = result else {
            panic!("expected Applied");
        };
        assert_eq!(lead.status, LeadStatus::Qualifying);
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[0].text, copy::GREETING);
        assert_eq!(outbound[1].text, copy::question_prompt(QuestionKey::Idea));
    }

    #[tokio::test]
    async fn lead_not_paused_is_invalid() {
        let store = Arc::new(InMemoryLeadStore::new());
        let lead = lead_in(&store, LeadStatus::PendingApproval).await;
        let handler = ResumeFromHandoffHandler::new(store);

        let err = handler
            .handle(ResumeFromHandoffCommand { lead_id: lead.id }, Timestamp::now())
            .await
            .unwrap_err();

        assert!(matches!(err, LeadError::InvalidTransition { .. }));
    }
}
