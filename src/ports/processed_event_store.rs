//! ProcessedEventStore port - The idempotency ledger.
//!
//! Records which external messages and events have been processed so
//! that redelivery is a no-op. The (provider, external id) pair is unique
//! and the uniqueness constraint is the only duplicate-detection
//! mechanism: whichever concurrent writer inserts first wins.
//!
//! Two strategies use this store:
//!
//! - **Insert-early** (chat messages): `record` before any processing; a
//!   duplicate skips everything.
//! - **Check-then-process-then-record** (payments): `contains` first,
//!   process, then `record`; a duplicate on `record` means a concurrent
//!   delivery already did the work.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LeadId, Timestamp};

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub provider: String,
    pub external_id: String,
    pub event_type: String,
    pub lead_id: Option<LeadId>,
    pub processed_at: Timestamp,
}

impl ProcessedEvent {
    pub fn new(
        provider: impl Into<String>,
        external_id: impl Into<String>,
        event_type: impl Into<String>,
        lead_id: Option<LeadId>,
        processed_at: Timestamp,
    ) -> Self {
        Self {
            provider: provider.into(),
            external_id: external_id.into(),
            event_type: event_type.into(),
            lead_id,
            processed_at,
        }
    }
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this (provider, id) was seen.
    Inserted,
    /// Already recorded by an earlier or concurrent delivery.
    AlreadyExists,
}

#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Read-only existence check.
    async fn contains(&self, provider: &str, external_id: &str) -> Result<bool, DomainError>;

    /// Inserts the row. A uniqueness conflict is `AlreadyExists`, never an error.
    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError>;
}
