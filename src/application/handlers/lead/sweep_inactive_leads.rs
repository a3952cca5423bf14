//! SweepInactiveLeadsHandler - Closes conversations the client walked away from.
//!
//! Leads still qualifying become `Abandoned`; leads waiting on the
//! client further along become `Stale`. Either can be restarted with a
//! resume keyword. Running the sweep twice is harmless: each move is a
//! status CAS from the status the sweep observed, so a lead that moved
//! in between is skipped.

use std::sync::Arc;

use crate::domain::foundation::{LeadId, Timestamp};
use crate::domain::lead::{LeadError, LeadPatch, LeadStatus};
use crate::ports::{LeadRepository, StatusUpdate};

/// Status reason stamped on swept leads.
const INACTIVITY_REASON: &str = "inactivity";

const ABANDON_FROM: [LeadStatus; 2] = [LeadStatus::New, LeadStatus::Qualifying];

const STALE_FROM: [LeadStatus; 4] = [
    LeadStatus::TourOffered,
    LeadStatus::AwaitingDeposit,
    LeadStatus::AwaitingSlotSelection,
    LeadStatus::NeedsFollowUp,
];

#[derive(Debug, Clone)]
pub struct SweepInactiveLeadsCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepInactiveLeadsResult {
    pub abandoned: Vec<LeadId>,
    pub stale: Vec<LeadId>,
    /// Leads that moved between the scan and the update.
    pub skipped: usize,
}

pub struct SweepInactiveLeadsHandler {
    leads: Arc<dyn LeadRepository>,
    inactivity_days: i64,
}

impl SweepInactiveLeadsHandler {
    pub fn new(leads: Arc<dyn LeadRepository>, inactivity_days: i64) -> Self {
        Self {
            leads,
            inactivity_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: SweepInactiveLeadsCommand,
    ) -> Result<SweepInactiveLeadsResult, LeadError> {
        let silent_since = cmd.now.minus_days(self.inactivity_days);
        let mut result = SweepInactiveLeadsResult::default();

        for (from, to) in [
            (&ABANDON_FROM[..], LeadStatus::Abandoned),
            (&STALE_FROM[..], LeadStatus::Stale),
        ] {
            for lead in self.leads.find_inactive(from, silent_since).await? {
                let update = self
                    .leads
                    .update_if_matches(
                        &lead.id,
                        lead.status,
                        to,
                        LeadPatch::new(),
                        Some(INACTIVITY_REASON.to_string()),
                        cmd.now,
                    )
                    .await?;
                match update {
                    StatusUpdate::Applied(_) if to == LeadStatus::Abandoned => result.abandoned.push(lead.id),
                    StatusUpdate::Applied(_) => result.stale.push(lead.id),
                    StatusUpdate::Mismatch { actual } => {
                        tracing::debug!(lead_id = %lead.id, actual = %actual, "Lead moved during sweep");
                        result.skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            abandoned = result.abandoned.len(),
            stale = result.stale.len(),
            skipped = result.skipped,
            "Inactivity sweep finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLeadStore;
    use crate::domain::foundation::ChannelId;

    async fn lead(
        store: &InMemoryLeadStore,
        phone: &str,
        status: LeadStatus,
        last_message: Timestamp,
    ) -> LeadId {
        let (mut lead, _) = store
            .get_or_create(&ChannelId::new(phone).unwrap(), last_message)
            .await
            .unwrap();
        lead.status = status;
        lead.last_client_message_at = Some(last_message);
        store.insert(lead.clone()).await;
        lead.id
    }

    #[tokio::test]
    async fn silent_leads_are_abandoned_or_stale() {
        let store = Arc::new(InMemoryLeadStore::new());
        let now = Timestamp::now();
        let old = now.minus_days(10);
        let qualifying = lead(&store, "+447700900001", LeadStatus::Qualifying, old).await;
        let awaiting = lead(&store, "+447700900002", LeadStatus::AwaitingDeposit, old).await;
        let recent = lead(&store, "+447700900003", LeadStatus::Qualifying, now.minus_days(1)).await;
        let booked = lead(&store, "+447700900004", LeadStatus::Booked, old).await;
        let handler = SweepInactiveLeadsHandler::new(store.clone(), 7);

        let result = handler.handle(SweepInactiveLeadsCommand { now }).await.unwrap();

        assert_eq!(result.abandoned, vec![qualifying]);
        assert_eq!(result.stale, vec![awaiting]);
        for (id, status) in [
            (qualifying, LeadStatus::Abandoned),
            (awaiting, LeadStatus::Stale),
            (recent, LeadStatus::Qualifying),
            (booked, LeadStatus::Booked),
        ] {
            assert_eq!(store.find_by_id(&id).await.unwrap().unwrap().status, status);
        }
        let swept = store.find_by_id(&qualifying).await.unwrap().unwrap();
        assert_eq!(swept.status_reason.as_deref(), Some("inactivity"));
    }

    #[tokio::test]
    async fn second_sweep_changes_nothing() {
        let store = Arc::new(InMemoryLeadStore::new());
        let now = Timestamp::now();
        lead(&store, "+447700900001", LeadStatus::New, now.minus_days(30)).await;
        let handler = SweepInactiveLeadsHandler::new(store, 7);

        handler.handle(SweepInactiveLeadsCommand { now }).await.unwrap();
        let second = handler.handle(SweepInactiveLeadsCommand { now }).await.unwrap();

        assert_eq!(second, SweepInactiveLeadsResult::default());
    }
}
