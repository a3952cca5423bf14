//! RepairTracker - Per-lead, per-field parse failure bookkeeping.
//!
//! Counters live on the lead row and change through single atomic
//! updates, so two racing failures both count.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, LeadId};
use crate::domain::lead::ParseField;
use crate::ports::LeadRepository;

/// What to do after a failed parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairDecision {
    /// Below threshold: re-ask with the repair prompt.
    Retry { failures: u32 },
    /// Threshold reached: hand the conversation to a person.
    Escalate { failures: u32 },
}

#[derive(Clone)]
pub struct RepairTracker {
    leads: Arc<dyn LeadRepository>,
    threshold: u32,
}

impl RepairTracker {
    pub fn new(leads: Arc<dyn LeadRepository>, threshold: u32) -> Self {
        Self { leads, threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub async fn increment_failure(&self, lead_id: &LeadId, field: ParseField) -> Result<u32, DomainError> {
        self.leads.increment_parse_failure(lead_id, field).await
    }

    pub async fn reset_failure(&self, lead_id: &LeadId, field: ParseField) -> Result<(), DomainError> {
        self.leads.reset_parse_failure(lead_id, field).await
    }

    pub async fn get_failure_count(&self, lead_id: &LeadId, field: ParseField) -> Result<u32, DomainError> {
        Ok(self
            .leads
            .find_by_id(lead_id)
            .await?
            .map(|lead| lead.parse_failures.get(field))
            .unwrap_or(0))
    }

    pub fn should_escalate(&self, failures: u32) -> bool {
        failures >= self.threshold
    }

    /// Counts one failure and decides between retry and escalation.
    pub async fn record_failure(&self, lead_id: &LeadId, field: ParseField) -> Result<RepairDecision, DomainError> {
        let failures = self.increment_failure(lead_id, field).await?;
        if self.should_escalate(failures) {
            Ok(RepairDecision::Escalate { failures })
        } else {
            Ok(RepairDecision::Retry { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLeadStore;
    use crate::domain::foundation::{ChannelId, Timestamp};

    async fn setup(threshold: u32) -> (RepairTracker, LeadId) {
        let store = Arc::new(InMemoryLeadStore::new());
        let (lead, _) = store
            .get_or_create(&ChannelId::new("+447700900123").unwrap(), Timestamp::now())
            .await
            .unwrap();
        (RepairTracker::new(store, threshold), lead.id)
    }

    #[tokio::test]
    async fn retries_until_threshold_then_escalates() {
        let (tracker, id) = setup(3).await;

        assert_eq!(
            tracker.record_failure(&id, ParseField::Budget).await.unwrap(),
            RepairDecision::Retry { failures: 1 }
        );
        assert_eq!(
            tracker.record_failure(&id, ParseField::Budget).await.unwrap(),
            RepairDecision::Retry { failures: 2 }
        );
        assert_eq!(
            tracker.record_failure(&id, ParseField::Budget).await.unwrap(),
            RepairDecision::Escalate { failures: 3 }
        );
    }

    #[tokio::test]
    async fn fields_are_counted_independently() {
        let (tracker, id) = setup(2).await;
        tracker.record_failure(&id, ParseField::Budget).await.unwrap();

        assert_eq!(
            tracker.record_failure(&id, ParseField::Dimensions).await.unwrap(),
            RepairDecision::Retry { failures: 1 }
        );
        assert_eq!(tracker.get_failure_count(&id, ParseField::Budget).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_clears_the_field() {
        let (tracker, id) = setup(3).await;
        tracker.record_failure(&id, ParseField::Location).await.unwrap();
        tracker.reset_failure(&id, ParseField::Location).await.unwrap();

        assert_eq!(tracker.get_failure_count(&id, ParseField::Location).await.unwrap(), 0);
    }
}
