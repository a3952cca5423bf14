//! Lead aggregate.
//!
//! Storage adapters hold the authoritative copy; this type is the
//! in-memory view a handler works from plus the rules every adapter
//! applies when it writes a status change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::derived::Qualification;
use super::errors::LeadError;
use super::parse_failures::ParseFailureCounts;
use super::question::QuestionKey;
use super::status::LeadStatus;
use crate::domain::foundation::{ChannelId, LeadId, StateMachine, Timestamp};
use crate::domain::parsing::TimeSlot;

/// Fails with `InvalidTransition` unless `to` is in `from`'s table entry.
pub fn check_transition(from: LeadStatus, to: LeadStatus) -> Result<(), LeadError> {
    if from.can_transition_to(&to) {
        Ok(())
    } else {
        Err(LeadError::invalid_transition(from, to))
    }
}

/// One prospective client's conversation and booking journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub channel_id: ChannelId,
    pub status: LeadStatus,
    pub status_reason: Option<String>,
    /// Status to return to when a human-handoff pause is lifted.
    pub paused_from: Option<LeadStatus>,
    pub current_step: u32,
    pub parse_failures: ParseFailureCounts,
    pub qualification: Option<Qualification>,
    pub checkout_session_id: Option<String>,
    pub deposit_amount_pence: Option<i64>,
    pub offered_slots: Vec<TimeSlot>,
    pub selected_slot: Option<TimeSlot>,
    pub last_client_message_at: Option<Timestamp>,
    pub last_outbound_message_at: Option<Timestamp>,
    pub last_holding_reply_at: Option<Timestamp>,
    /// When each status was last entered.
    pub phase_entered_at: BTreeMap<LeadStatus, Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Lead {
    /// A lead on first contact.
    pub fn new(channel_id: ChannelId, now: Timestamp) -> Self {
        let mut phase_entered_at = BTreeMap::new();
        phase_entered_at.insert(LeadStatus::New, now);
        Self {
            id: LeadId::new(),
            channel_id,
            status: LeadStatus::New,
            status_reason: None,
            paused_from: None,
            current_step: 0,
            parse_failures: ParseFailureCounts::new(),
            qualification: None,
            checkout_session_id: None,
            deposit_amount_pence: None,
            offered_slots: Vec::new(),
            selected_slot: None,
            last_client_message_at: None,
            last_outbound_message_at: None,
            last_holding_reply_at: None,
            phase_entered_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// The question to ask next while qualifying.
    pub fn current_question(&self) -> Option<QuestionKey> {
        QuestionKey::at(self.current_step)
    }

    pub fn entered_at(&self, status: LeadStatus) -> Option<Timestamp> {
        self.phase_entered_at.get(&status).copied()
    }

    pub fn deposit_paid_at(&self) -> Option<Timestamp> {
        self.entered_at(LeadStatus::DepositPaid)
    }

    pub fn booked_at(&self) -> Option<Timestamp> {
        self.entered_at(LeadStatus::Booked)
    }

    /// Status a paused lead goes back to.
    ///
    /// A lead paused before qualification began (still `New`) resumes
    /// straight into `Qualifying`, as does one whose origin is unknown.
    pub fn resume_status(&self) -> LeadStatus {
        self.paused_from
            .filter(|from| LeadStatus::NeedsHumanReply.can_transition_to(from))
            .unwrap_or(LeadStatus::Qualifying)
    }

    /// Applies a status change and its bookkeeping.
    ///
    /// Entering `NeedsHumanReply` remembers where the lead paused;
    /// leaving it forgets. Entering `New` starts a fresh qualification
    /// round: step, counters, derived fields and slots are cleared.
    pub fn transition_to(
        &mut self,
        to: LeadStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), LeadError> {
        check_transition(self.status, to)?;

        if to == LeadStatus::NeedsHumanReply {
            self.paused_from = Some(self.status);
        } else if self.status == LeadStatus::NeedsHumanReply {
            self.paused_from = None;
        }

        if to == LeadStatus::New {
            self.current_step = 0;
            self.parse_failures.clear();
            self.qualification = None;
            self.offered_slots.clear();
            self.selected_slot = None;
        }

        self.status = to;
        self.status_reason = reason;
        self.phase_entered_at.insert(to, now);
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: &LeadPatch) {
        if let Some(qualification) = &patch.qualification {
            self.qualification = Some(qualification.clone());
        }
        if let Some(session) = &patch.checkout_session_id {
            self.checkout_session_id = Some(session.clone());
        }
        if let Some(amount) = patch.deposit_amount_pence {
            self.deposit_amount_pence = Some(amount);
        }
        if let Some(slots) = &patch.offered_slots {
            self.offered_slots = slots.clone();
        }
        if let Some(slot) = patch.selected_slot {
            self.selected_slot = Some(slot);
        }
    }
}

/// Extra fields written together with a status change.
///
/// `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub qualification: Option<Qualification>,
    pub checkout_session_id: Option<String>,
    pub deposit_amount_pence: Option<i64>,
    pub offered_slots: Option<Vec<TimeSlot>>,
    pub selected_slot: Option<TimeSlot>,
}

impl LeadPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_qualification(mut self, qualification: Qualification) -> Self {
        self.qualification = Some(qualification);
        self
    }

    pub fn with_deposit(mut self, checkout_session_id: impl Into<String>, amount_pence: i64) -> Self {
        self.checkout_session_id = Some(checkout_session_id.into());
        self.deposit_amount_pence = Some(amount_pence);
        self
    }

    pub fn with_offered_slots(mut self, slots: Vec<TimeSlot>) -> Self {
        self.offered_slots = Some(slots);
        self
    }

    pub fn with_selected_slot(mut self, slot: TimeSlot) -> Self {
        self.selected_slot = Some(slot);
        self
    }
}
