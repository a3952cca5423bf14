//! Payment webhook errors.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::domain::lead::LeadError;

/// Errors raised while verifying or applying a payment webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,

    /// Older than the replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Further in the future than the allowed clock skew.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    /// The lead was not in a status this event applies to.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Acknowledged but not acted on.
    #[error("Event ignored: {0}")]
    Ignored(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True when the sender should deliver the event again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::LeadNotFound(_))
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

impl From<LeadError> for WebhookError {
    fn from(err: LeadError) -> Self {
        match err {
            LeadError::NotFound(id) => WebhookError::LeadNotFound(id.to_string()),
            LeadError::InvalidTransition { .. } | LeadError::StatusChanged { .. } => {
                WebhookError::InvalidTransition(err.to_string())
            }
            LeadError::Validation(e) => WebhookError::ParseError(e.to_string()),
            LeadError::Infrastructure(message) => WebhookError::Database(message),
        }
    }
}
