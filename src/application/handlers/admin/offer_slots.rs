//! OfferSlotsHandler - Sends appointment options after the deposit.
//!
//! Also used to re-offer when a pending booking falls through.

use std::sync::Arc;

use super::{compare_and_set, load_in, AdminActionResult};
use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{LeadId, Timestamp, ValidationError};
use crate::domain::lead::{LeadError, LeadPatch, LeadStatus};
use crate::domain::parsing::TimeSlot;
use crate::ports::LeadRepository;

#[derive(Debug, Clone)]
pub struct OfferSlotsCommand {
    pub lead_id: LeadId,
    /// Numbered 1.. in the offer, in this order.
    pub slots: Vec<TimeSlot>,
}

pub struct OfferSlotsHandler {
    leads: Arc<dyn LeadRepository>,
}

impl OfferSlotsHandler {
    pub fn new(leads: Arc<dyn LeadRepository>) -> Self {
        Self { leads }
    }

    pub async fn handle(
        &self,
        cmd: OfferSlotsCommand,
        now: Timestamp,
    ) -> Result<AdminActionResult, LeadError> {
        if cmd.slots.is_empty() {
            return Err(ValidationError::empty_field("slots").into());
        }

        let to = LeadStatus::AwaitingSlotSelection;
        let lead = load_in(
            self.leads.as_ref(),
            &cmd.lead_id,
            &[LeadStatus::DepositPaid, LeadStatus::BookingPending],
            to,
        )
        .await?;

        let text = copy::slot_offer(&cmd.slots);
        let patch = LeadPatch::new().with_offered_slots(cmd.slots);

        Ok(
            match compare_and_set(self.leads.as_ref(), &lead, to, patch, None, now).await? {
                Ok(lead) => {
                    let outbound = vec![OutboundMessage::to_client(lead.id, lead.channel_id.clone(), text)];
                    AdminActionResult::Applied { lead, outbound }
                }
                Err(actual) => AdminActionResult::AlreadyMoved { actual },
            },
        )
    }
}
