//! ApproveLeadHandler - The artist accepts a request and asks for a deposit.
//!
//! The checkout session is created by the payment collaborator before
//! this runs; the handler locks its id and the deposit amount onto the
//! lead so the payment confirmation can be matched later.

use std::sync::Arc;

use super::{compare_and_set, load_in, AdminActionResult};
use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{LeadError, LeadPatch, LeadStatus};
use crate::ports::LeadRepository;

#[derive(Debug, Clone)]
pub struct ApproveLeadCommand {
    pub lead_id: LeadId,
    pub checkout_session_id: String,
    pub checkout_url: String,
    /// Overrides the configured deposit.
    pub deposit_pence: Option<i64>,
}

pub struct ApproveLeadHandler {
    leads: Arc<dyn LeadRepository>,
    default_deposit_pence: i64,
}

impl ApproveLeadHandler {
    pub fn new(leads: Arc<dyn LeadRepository>, default_deposit_pence: i64) -> Self {
        Self {
            leads,
            default_deposit_pence,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApproveLeadCommand,
        now: Timestamp,
    ) -> Result<AdminActionResult, LeadError> {
        let to = LeadStatus::AwaitingDeposit;
        let lead = load_in(self.leads.as_ref(), &cmd.lead_id, &[LeadStatus::PendingApproval], to).await?;

        let amount = cmd.deposit_pence.unwrap_or(self.default_deposit_pence);
        let patch = LeadPatch::new().with_deposit(cmd.checkout_session_id, amount);

        Ok(
            match compare_and_set(self.leads.as_ref(), &lead, to, patch, None, now).await? {
                Ok(lead) => {
                    let text = copy::deposit_request(amount, &cmd.checkout_url);
                    let outbound = vec![OutboundMessage::to_client(lead.id, lead.channel_id.clone(), text)];
                    AdminActionResult::Applied { lead, outbound }
                }
                Err(actual) => AdminActionResult::AlreadyMoved { actual },
            },
        )
    }
}
