//! Message sender that records instead of delivering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::conversation::OutboundMessage;
use crate::domain::foundation::{ChannelId, DomainError, ErrorCode};
use crate::ports::MessageSender;

/// Captures every message it is asked to send.
///
/// Can be switched into a failing mode to exercise delivery errors.
#[derive(Default)]
pub struct RecordingMessageSender {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
}

impl RecordingMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail with `DeliveryFailed`.
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.lock().clone()
    }

    pub fn sent_to(&self, recipient: &ChannelId) -> Vec<OutboundMessage> {
        self.lock()
            .iter()
            .filter(|m| &m.recipient == recipient)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutboundMessage>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MessageSender for RecordingMessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DeliveryFailed,
                format!("delivery to {} refused", message.recipient.as_str()),
            ));
        }
        self.lock().push(message.clone());
        Ok(())
    }
}
