//! Lead workflow errors.
//!
//! Lost races are not errors here: step advances, status CAS and the
//! idempotency ledger report them as typed outcomes. `StatusChanged` is
//! the one exception because the locked transition has no outcome to
//! return other than failure.

use thiserror::Error;

use super::status::LeadStatus;
use crate::domain::foundation::{DomainError, ErrorCode, LeadId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadError {
    #[error("Lead not found: {0}")]
    NotFound(LeadId),

    /// The requested move is not in the transition table. Always a bug
    /// in the caller.
    #[error("Cannot transition lead from {from} to {to}")]
    InvalidTransition { from: LeadStatus, to: LeadStatus },

    /// Another writer changed the status between the caller's read and
    /// the row lock, and the move is no longer legal.
    #[error("Lead status changed from {expected} to {actual} before the transition applied")]
    StatusChanged {
        expected: LeadStatus,
        actual: LeadStatus,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl LeadError {
    pub fn invalid_transition(from: LeadStatus, to: LeadStatus) -> Self {
        LeadError::InvalidTransition { from, to }
    }

    pub fn status_changed(expected: LeadStatus, actual: LeadStatus) -> Self {
        LeadError::StatusChanged { expected, actual }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        LeadError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LeadError::NotFound(_) => ErrorCode::LeadNotFound,
            LeadError::InvalidTransition { .. } | LeadError::StatusChanged { .. } => {
                ErrorCode::InvalidStateTransition
            }
            LeadError::Validation(_) => ErrorCode::ValidationFailed,
            LeadError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// True when a concurrent writer won and the caller may recover locally.
    pub fn is_concurrency_loss(&self) -> bool {
        matches!(self, LeadError::StatusChanged { .. })
    }
}

impl From<DomainError> for LeadError {
    fn from(err: DomainError) -> Self {
        LeadError::Infrastructure(err.to_string())
    }
}

impl From<LeadError> for DomainError {
    fn from(err: LeadError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
