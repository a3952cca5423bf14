//! Admin action handlers.
//!
//! Actions taken by the studio outside the chat thread. Each one is a
//! status compare-and-set from the status the caller observed, so an
//! action racing the conversation (or another admin) loses cleanly
//! instead of overwriting.

mod approve_lead;
mod mark_booked;
mod offer_slots;
mod reject_lead;
mod resume_from_handoff;

pub use approve_lead::{ApproveLeadCommand, ApproveLeadHandler};
pub use mark_booked::{MarkBookedCommand, MarkBookedHandler};
pub use offer_slots::{OfferSlotsCommand, OfferSlotsHandler};
pub use reject_lead::{RejectLeadCommand, RejectLeadHandler};
pub use resume_from_handoff::{ResumeFromHandoffCommand, ResumeFromHandoffHandler};

use crate::domain::conversation::OutboundMessage;
use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{Lead, LeadError, LeadPatch, LeadStatus};
use crate::ports::{LeadRepository, StatusUpdate};

/// Outcome shared by every admin action.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminActionResult {
    /// The status moved; `outbound` holds the client notice.
    Applied {
        lead: Lead,
        outbound: Vec<OutboundMessage>,
    },
    /// The lead left the expected status before the update landed.
    AlreadyMoved { actual: LeadStatus },
}

impl AdminActionResult {
    pub fn outbound(&self) -> &[OutboundMessage] {
        match self {
            AdminActionResult::Applied { outbound, .. } => outbound,
            AdminActionResult::AlreadyMoved { .. } => &[],
        }
    }
}

/// Loads the lead and checks its status is one the action starts from.
async fn load_in(
    leads: &dyn LeadRepository,
    lead_id: &LeadId,
    allowed_from: &[LeadStatus],
    to: LeadStatus,
) -> Result<Lead, LeadError> {
    let lead = leads
        .find_by_id(lead_id)
        .await?
        .ok_or(LeadError::NotFound(*lead_id))?;
    if !allowed_from.contains(&lead.status) {
        return Err(LeadError::invalid_transition(lead.status, to));
    }
    Ok(lead)
}

/// CAS from the observed status, logging the lost race.
async fn compare_and_set(
    leads: &dyn LeadRepository,
    lead: &Lead,
    to: LeadStatus,
    patch: LeadPatch,
    reason: Option<String>,
    now: Timestamp,
) -> Result<Result<Lead, LeadStatus>, LeadError> {
    match leads
        .update_if_matches(&lead.id, lead.status, to, patch, reason, now)
        .await?
    {
        StatusUpdate::Applied(updated) => {
            tracing::info!(lead_id = %lead.id, from = %lead.status, to = %to, "Admin action applied");
            Ok(Ok(updated))
        }
        StatusUpdate::Mismatch { actual } => {
            tracing::info!(
                lead_id = %lead.id,
                expected = %lead.status,
                actual = %actual,
                "Admin action lost race, lead already moved"
            );
            Ok(Err(actual))
        }
    }
}
