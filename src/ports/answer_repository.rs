//! AnswerRepository port - Append-only qualification answers.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LeadId, Timestamp};
use crate::domain::lead::{Answer, NewAnswer};

/// Answers are never updated or deleted. Readers resolve multiple rows
/// per question with `CurrentAnswers`.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Appends an answer; storage assigns the id.
    async fn append(&self, answer: NewAnswer, created_at: Timestamp) -> Result<Answer, DomainError>;

    /// All rows for a lead, in any order.
    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Answer>, DomainError>;
}
