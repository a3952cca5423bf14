//! PostgreSQL implementation of ProcessedEventStore.
//!
//! The primary key on (provider, external_id) decides every race:
//! `ON CONFLICT DO NOTHING` turns the losing insert into zero affected rows.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{ProcessedEvent, ProcessedEventStore, SaveResult};

#[derive(Clone)]
pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn contains(&self, provider: &str, external_id: &str) -> Result<bool, DomainError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM processed_events WHERE provider = $1 AND external_id = $2)",
        )
        .bind(provider)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check processed event", e))?;

        Ok(exists)
    }

    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (provider, external_id, event_type, lead_id, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, external_id) DO NOTHING
            "#,
        )
        .bind(&event.provider)
        .bind(&event.external_id)
        .bind(&event.event_type)
        .bind(event.lead_id.map(|id| *id.as_uuid()))
        .bind(event.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record processed event", e))?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                provider = %event.provider,
                external_id = %event.external_id,
                "Event already recorded"
            );
            return Ok(SaveResult::AlreadyExists);
        }
        Ok(SaveResult::Inserted)
    }
}
