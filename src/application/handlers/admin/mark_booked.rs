//! MarkBookedHandler - Confirms the appointment.

use std::sync::Arc;

use super::{compare_and_set, load_in, AdminActionResult};
use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{LeadError, LeadPatch, LeadStatus};
use crate::ports::LeadRepository;

#[derive(Debug, Clone)]
pub struct MarkBookedCommand {
    pub lead_id: LeadId,
}

pub struct MarkBookedHandler {
    leads: Arc<dyn LeadRepository>,
}

impl MarkBookedHandler {
    pub fn new(leads: Arc<dyn LeadRepository>) -> Self {
        Self { leads }
    }

    pub async fn handle(
        &self,
        cmd: MarkBookedCommand,
        now: Timestamp,
    ) -> Result<AdminActionResult, LeadError> {
        let to = LeadStatus::Booked;
        let lead = load_in(
            self.leads.as_ref(),
            &cmd.lead_id,
            &[LeadStatus::BookingPending, LeadStatus::DepositPaid],
            to,
        )
        .await?;

        Ok(
            match compare_and_set(self.leads.as_ref(), &lead, to, LeadPatch::new(), None, now).await? {
                Ok(lead) => {
                    let text = copy::booked(lead.selected_slot.as_ref());
                    let outbound = vec![OutboundMessage::to_client(lead.id, lead.channel_id.clone(), text)];
                    AdminActionResult::Applied { lead, outbound }
                }
                Err(actual) => AdminActionResult::AlreadyMoved { actual },
            },
        )
    }
}
