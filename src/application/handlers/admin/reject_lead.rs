//! RejectLeadHandler - The artist declines a request.

use std::sync::Arc;

use super::{compare_and_set, load_in, AdminActionResult};
use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{LeadError, LeadPatch, LeadStatus};
use crate::ports::LeadRepository;

/// Statuses a request can still be declined from.
const REJECTABLE: [LeadStatus; 3] = [
    LeadStatus::PendingApproval,
    LeadStatus::NeedsFollowUp,
    LeadStatus::AwaitingDeposit,
];

#[derive(Debug, Clone)]
pub struct RejectLeadCommand {
    pub lead_id: LeadId,
    pub reason: Option<String>,
}

pub struct RejectLeadHandler {
    leads: Arc<dyn LeadRepository>,
}

impl RejectLeadHandler {
    pub fn new(leads: Arc<dyn LeadRepository>) -> Self {
        Self { leads }
    }

    pub async fn handle(
        &self,
        cmd: RejectLeadCommand,
        now: Timestamp,
    ) -> Result<AdminActionResult, LeadError> {
        let to = LeadStatus::Rejected;
        let lead = load_in(self.leads.as_ref(), &cmd.lead_id, &REJECTABLE, to).await?;

        Ok(
            match compare_and_set(self.leads.as_ref(), &lead, to, LeadPatch::new(), cmd.reason, now).await? {
                Ok(lead) => {
                    let outbound = vec![OutboundMessage::to_client(
                        lead.id,
                        lead.channel_id.clone(),
                        copy::REJECTED,
                    )];
                    AdminActionResult::Applied { lead, outbound }
                }
                Err(actual) => AdminActionResult::AlreadyMoved { actual },
            },
        )
    }
}
