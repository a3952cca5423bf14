//! LeadRepository port - Lead persistence and its concurrency primitives.
//!
//! The lead row is the unit of mutual exclusion. Every cross-request
//! coordination goes through one of three primitives:
//!
//! - `transition` with [`RowLock::Exclusive`]: lock the row, re-read,
//!   re-validate against the fresh status, write, commit.
//! - `advance_step_if_at` and `update_if_matches`: single conditional
//!   UPDATEs that affect zero or one row.
//! - The unique constraint of the idempotency ledger (separate port).
//!
//! Lost races come back as typed outcomes, not errors.

use async_trait::async_trait;

use crate::domain::foundation::{ChannelId, DomainError, LeadId, Timestamp};
use crate::domain::lead::{Lead, LeadError, LeadPatch, LeadStatus, ParseField};

/// Locking mode for `transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// Pessimistic row lock with a re-read under the lock.
    Exclusive,
    /// Conditional write on the status the caller observed.
    Unlocked,
}

/// Outcome of a conditional step advance.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAdvance {
    Advanced(Lead),
    /// The step was no longer at the expected value. The caller must not
    /// resend the next question.
    AlreadyAdvanced,
}

/// Outcome of a status compare-and-set.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Applied(Lead),
    /// The status had already moved on; `actual` is what it is now.
    Mismatch { actual: LeadStatus },
}

/// Outcome of recording an inbound message time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOrdering {
    InOrder,
    /// Older than the last recorded client message; discard it.
    OutOfOrder { last_seen: Timestamp },
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Returns the lead for `channel_id`, creating it in `New` if absent.
    /// The flag is true when this call created it.
    async fn get_or_create(
        &self,
        channel_id: &ChannelId,
        now: Timestamp,
    ) -> Result<(Lead, bool), DomainError>;

    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, DomainError>;

    async fn find_by_channel(&self, channel_id: &ChannelId) -> Result<Option<Lead>, DomainError>;

    /// Moves `lead` from the status the caller observed to `to`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` when `to` is not reachable from the observed status
    /// - `StatusChanged` when another writer moved the lead and `to` is no
    ///   longer reachable from the fresh status
    /// - `NotFound` when the row is gone
    async fn transition(
        &self,
        lead: &Lead,
        to: LeadStatus,
        reason: Option<String>,
        lock: RowLock,
        now: Timestamp,
    ) -> Result<Lead, LeadError>;

    /// Increments `current_step` by one only if it equals `expected_step`.
    async fn advance_step_if_at(
        &self,
        id: &LeadId,
        expected_step: u32,
        now: Timestamp,
    ) -> Result<StepAdvance, DomainError>;

    /// Sets status to `new_status` with `patch` only if it is `expected`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when `new_status` is not reachable from `expected`.
    async fn update_if_matches(
        &self,
        id: &LeadId,
        expected: LeadStatus,
        new_status: LeadStatus,
        patch: LeadPatch,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<StatusUpdate, LeadError>;

    /// Records an inbound message time unless it is older than the last one.
    async fn record_inbound(&self, id: &LeadId, at: Timestamp) -> Result<InboundOrdering, DomainError>;

    async fn record_outbound(&self, id: &LeadId, at: Timestamp) -> Result<(), DomainError>;

    /// Claims the right to send a holding reply. False when one was sent
    /// less than `min_interval_secs` ago.
    async fn claim_holding_reply(
        &self,
        id: &LeadId,
        now: Timestamp,
        min_interval_secs: i64,
    ) -> Result<bool, DomainError>;

    /// Atomically adds one failure for `field`, returning the new count.
    async fn increment_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<u32, DomainError>;

    async fn reset_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<(), DomainError>;

    /// Leads in one of `statuses` whose last client message (or creation,
    /// if none) is older than `silent_since`.
    async fn find_inactive(
        &self,
        statuses: &[LeadStatus],
        silent_since: Timestamp,
    ) -> Result<Vec<Lead>, DomainError>;

    /// Resets a lead whose stored status could not be read back to `New`
    /// at step zero.
    ///
    /// This is the one write that does not consult the transition table.
    /// Callers must only use it for leads loaded as `Unrecognized`.
    async fn recover_unrecognized_status(&self, id: &LeadId, now: Timestamp) -> Result<Lead, DomainError>;
}
