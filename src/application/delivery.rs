//! Best-effort delivery of outbound message intents.
//!
//! Runs after the handler that produced the intents has committed.
//! Failures are logged and counted; they never touch lead state.

use crate::domain::conversation::{Audience, OutboundMessage};
use crate::domain::foundation::Timestamp;
use crate::ports::{LeadRepository, MessageSender};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends each message in order. Client deliveries stamp the lead's
/// last outbound time.
pub async fn deliver_outbound(
    sender: &dyn MessageSender,
    leads: &dyn LeadRepository,
    messages: &[OutboundMessage],
    now: Timestamp,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for message in messages {
        if let Err(err) = sender.send(message).await {
            tracing::warn!(
                recipient = %message.recipient,
                audience = ?message.audience,
                error = %err,
                "Outbound message delivery failed"
            );
            report.failed += 1;
            continue;
        }
        report.delivered += 1;

        if let (Audience::Client, Some(lead_id)) = (message.audience, message.lead_id) {
            if let Err(err) = leads.record_outbound(&lead_id, now).await {
                tracing::warn!(lead_id = %lead_id, error = %err, "Failed to stamp outbound time");
            }
        }
    }

    report
}
