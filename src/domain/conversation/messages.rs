//! Inbound and outbound chat message shapes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChannelId, LeadId, Timestamp};

/// Provider name for the primary chat channel.
pub const WHATSAPP_PROVIDER: &str = "whatsapp";

/// A message delivered by the chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub provider: String,
    /// Provider's message id, the idempotency ledger key.
    pub external_message_id: String,
    pub sender: ChannelId,
    pub text: String,
    /// Provider timestamp, used for the out-of-order check.
    pub received_at: Timestamp,
    #[serde(default)]
    pub has_media: bool,
}

impl InboundMessage {
    pub fn new(
        provider: impl Into<String>,
        external_message_id: impl Into<String>,
        sender: ChannelId,
        text: impl Into<String>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            provider: provider.into(),
            external_message_id: external_message_id.into(),
            sender,
            text: text.into(),
            received_at,
            has_media: false,
        }
    }

    pub fn with_media(mut self) -> Self {
        self.has_media = true;
        self
    }
}

/// Who a message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Client,
    Artist,
}

/// A message the core wants sent. Delivery is someone else's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: ChannelId,
    pub text: String,
    pub audience: Audience,
    /// Lead the message is about.
    pub lead_id: Option<LeadId>,
}

impl OutboundMessage {
    pub fn to_client(lead_id: LeadId, recipient: ChannelId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            audience: Audience::Client,
            lead_id: Some(lead_id),
        }
    }

    pub fn to_artist(recipient: ChannelId, lead_id: LeadId, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            audience: Audience::Artist,
            lead_id: Some(lead_id),
        }
    }
}
