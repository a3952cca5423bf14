//! Log-only message sender.
//!
//! Writes each outbound message to the log instead of calling the chat
//! provider. The binary uses it until a provider adapter is wired in.

use async_trait::async_trait;

use crate::domain::conversation::{Audience, OutboundMessage};
use crate::domain::foundation::DomainError;
use crate::ports::MessageSender;

#[derive(Debug, Clone, Default)]
pub struct LoggingMessageSender;

impl LoggingMessageSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageSender for LoggingMessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        let audience = match message.audience {
            Audience::Client => "client",
            Audience::Artist => "artist",
        };
        tracing::info!(
            recipient = %message.recipient.as_str(),
            audience,
            lead_id = ?message.lead_id,
            text = %message.text,
            "Outbound message logged, not delivered"
        );
        Ok(())
    }
}
