//! PostgreSQL implementation of AnswerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AnswerId, DomainError, ErrorCode, LeadId, Timestamp};
use crate::domain::lead::{Answer, NewAnswer, QuestionKey};
use crate::ports::AnswerRepository;

/// Append-only answer storage in `lead_answers`.
#[derive(Clone)]
pub struct PostgresAnswerRepository {
    pool: PgPool,
}

impl PostgresAnswerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: i64,
    lead_id: Uuid,
    question_key: String,
    answer_text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for Answer {
    type Error = DomainError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let question_key: QuestionKey = row.question_key.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid question_key: {}", e))
        })?;

        Ok(Answer {
            id: AnswerId::new(row.id),
            lead_id: LeadId::from_uuid(row.lead_id),
            question_key,
            text: row.answer_text,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl AnswerRepository for PostgresAnswerRepository {
    async fn append(&self, answer: NewAnswer, created_at: Timestamp) -> Result<Answer, DomainError> {
        let row: AnswerRow = sqlx::query_as(
            r#"
            INSERT INTO lead_answers (lead_id, question_key, answer_text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, lead_id, question_key, answer_text, created_at
            "#,
        )
        .bind(answer.lead_id.as_uuid())
        .bind(answer.question_key.as_str())
        .bind(&answer.text)
        .bind(created_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to append answer", e))?;

        Answer::try_from(row)
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<Answer>, DomainError> {
        let rows: Vec<AnswerRow> = sqlx::query_as(
            r#"
            SELECT id, lead_id, question_key, answer_text, created_at
            FROM lead_answers
            WHERE lead_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(lead_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list answers", e))?;

        rows.into_iter().map(Answer::try_from).collect()
    }
}
