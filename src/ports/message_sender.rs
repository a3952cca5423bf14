//! MessageSender port - Chat delivery.
//!
//! Implementations own retries, timeouts and provider session-window
//! rules. The core only hands over finished messages.

use async_trait::async_trait;

use crate::domain::conversation::OutboundMessage;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// `DeliveryFailed` when the provider rejects or times out.
    async fn send(&self, message: &OutboundMessage) -> Result<(), DomainError>;
}
