//! HandlePaymentConfirmationHandler - Applies deposit webhooks.
//!
//! Uses check-then-process-then-record against the idempotency ledger:
//! a known event id is skipped up front, the status CAS does the work,
//! and the ledger row is written last. Two concurrent deliveries of the
//! same event both pass the check, but only one wins the CAS; the other
//! sees the lead already past `AwaitingDeposit` and reports
//! `AlreadyApplied`.

use std::sync::Arc;

use crate::domain::conversation::{copy, OutboundMessage};
use crate::domain::foundation::{ChannelId, Timestamp};
use crate::domain::lead::{format_pence, Lead, LeadPatch, LeadStatus};
use crate::domain::payment::{PaymentConfirmation, PaymentOutcome, StripeWebhookVerifier, WebhookError};
use crate::ports::{LeadRepository, ProcessedEvent, ProcessedEventStore, SaveResult, StatusUpdate};

/// Statuses that mean the deposit was already applied.
const PAID_OR_LATER: [LeadStatus; 4] = [
    LeadStatus::DepositPaid,
    LeadStatus::AwaitingSlotSelection,
    LeadStatus::BookingPending,
    LeadStatus::Booked,
];

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentConfirmationCommand {
    /// Raw webhook payload.
    pub payload: Vec<u8>,
    /// Webhook signature header.
    pub signature: String,
    pub received_at: Timestamp,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlePaymentConfirmationResult {
    /// Deposit recorded, lead moved to `DepositPaid`.
    DepositApplied {
        lead: Lead,
        outbound: Vec<OutboundMessage>,
    },
    /// A concurrent or earlier delivery already moved the lead.
    AlreadyApplied { actual: LeadStatus },
    /// Event id already in the ledger.
    Duplicate,
    /// Failed or expired checkout. Nothing to change.
    Acknowledged,
    /// Event type or payload this core does not act on.
    Ignored,
}

impl HandlePaymentConfirmationResult {
    pub fn outbound(&self) -> &[OutboundMessage] {
        match self {
            HandlePaymentConfirmationResult::DepositApplied { outbound, .. } => outbound,
            _ => &[],
        }
    }
}

/// Handler for deposit confirmation webhooks.
pub struct HandlePaymentConfirmationHandler {
    verifier: StripeWebhookVerifier,
    leads: Arc<dyn LeadRepository>,
    ledger: Arc<dyn ProcessedEventStore>,
    artist_channel: Option<ChannelId>,
}

impl HandlePaymentConfirmationHandler {
    pub fn new(
        verifier: StripeWebhookVerifier,
        leads: Arc<dyn LeadRepository>,
        ledger: Arc<dyn ProcessedEventStore>,
        artist_channel: Option<ChannelId>,
    ) -> Self {
        Self {
            verifier,
            leads,
            ledger,
            artist_channel,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentConfirmationCommand,
    ) -> Result<HandlePaymentConfirmationResult, WebhookError> {
        let now = cmd.received_at;

        // 1. Verify signature and parse
        let event = self
            .verifier
            .verify_and_parse_at(&cmd.payload, &cmd.signature, now)?;
        let confirmation = match PaymentConfirmation::from_stripe_event(&event) {
            Ok(confirmation) => confirmation,
            Err(WebhookError::Ignored(reason)) => {
                tracing::debug!(event_id = %event.id, reason = %reason, "Payment event ignored");
                return Ok(HandlePaymentConfirmationResult::Ignored);
            }
            Err(err) => return Err(err),
        };

        // 2. Skip known events
        if self
            .ledger
            .contains(&confirmation.provider, &confirmation.external_event_id)
            .await?
        {
            tracing::debug!(event_id = %confirmation.external_event_id, "Duplicate payment event suppressed");
            return Ok(HandlePaymentConfirmationResult::Duplicate);
        }

        // 3. Apply
        let result = match confirmation.outcome {
            PaymentOutcome::Paid { amount_pence } => {
                self.apply_deposit(&confirmation, amount_pence, now).await?
            }
            PaymentOutcome::Failed | PaymentOutcome::Expired => {
                tracing::info!(
                    lead_id = %confirmation.lead_id,
                    outcome = ?confirmation.outcome,
                    "Deposit checkout did not complete"
                );
                HandlePaymentConfirmationResult::Acknowledged
            }
        };

        // 4. Record
        let recorded = self
            .ledger
            .record(ProcessedEvent::new(
                confirmation.provider.clone(),
                confirmation.external_event_id.clone(),
                confirmation.event_type.clone(),
                Some(confirmation.lead_id),
                now,
            ))
            .await?;
        if recorded == SaveResult::AlreadyExists {
            tracing::debug!(
                event_id = %confirmation.external_event_id,
                "Payment event recorded by a concurrent delivery"
            );
        }

        Ok(result)
    }

    async fn apply_deposit(
        &self,
        confirmation: &PaymentConfirmation,
        amount_pence: i64,
        now: Timestamp,
    ) -> Result<HandlePaymentConfirmationResult, WebhookError> {
        let lead = self
            .leads
            .find_by_id(&confirmation.lead_id)
            .await?
            .ok_or_else(|| WebhookError::LeadNotFound(confirmation.lead_id.to_string()))?;

        if let (Some(expected), Some(actual)) = (&lead.checkout_session_id, &confirmation.checkout_session_id) {
            if expected != actual {
                tracing::warn!(
                    lead_id = %lead.id,
                    expected = %expected,
                    actual = %actual,
                    "Deposit paid on a different checkout session"
                );
            }
        }
        if let Some(locked) = lead.deposit_amount_pence {
            if locked != amount_pence {
                tracing::warn!(
                    lead_id = %lead.id,
                    locked_pence = locked,
                    paid_pence = amount_pence,
                    "Deposit amount differs from the locked amount"
                );
            }
        }

        let update = self
            .leads
            .update_if_matches(
                &lead.id,
                LeadStatus::AwaitingDeposit,
                LeadStatus::DepositPaid,
                LeadPatch::new(),
                None,
                now,
            )
            .await?;

        match update {
            StatusUpdate::Applied(lead) => {
                tracing::info!(lead_id = %lead.id, amount_pence, "Deposit applied");
                let mut outbound = vec![OutboundMessage::to_client(
                    lead.id,
                    lead.channel_id.clone(),
                    copy::DEPOSIT_RECEIVED,
                )];
                if let Some(artist) = &self.artist_channel {
                    outbound.push(OutboundMessage::to_artist(
                        artist.clone(),
                        lead.id,
                        format!(
                            "Deposit of {} paid by lead {} ({})",
                            format_pence(amount_pence),
                            lead.id,
                            lead.channel_id
                        ),
                    ));
                }
                Ok(HandlePaymentConfirmationResult::DepositApplied { lead, outbound })
            }
            StatusUpdate::Mismatch { actual } if PAID_OR_LATER.contains(&actual) => {
                tracing::info!(lead_id = %lead.id, actual = %actual, "Deposit already applied");
                Ok(HandlePaymentConfirmationResult::AlreadyApplied { actual })
            }
            StatusUpdate::Mismatch { actual } => {
                tracing::error!(
                    lead_id = %lead.id,
                    actual = %actual,
                    "Deposit paid for a lead not awaiting one"
                );
                Err(WebhookError::InvalidTransition(format!(
                    "deposit paid while lead is {}",
                    actual
                )))
            }
        }
    }
}
