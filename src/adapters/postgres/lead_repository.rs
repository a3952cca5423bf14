//! PostgreSQL implementation of LeadRepository.
//!
//! Structured lead fields (failure counters, qualification, slots and
//! phase times) live in JSONB columns. Locked transitions use
//! `SELECT ... FOR UPDATE` inside a transaction; every other concurrent
//! write is a single conditional UPDATE.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    ChannelId, DomainError, ErrorCode, LeadId, StateMachine, Timestamp,
};
use crate::domain::lead::{check_transition, Lead, LeadError, LeadPatch, LeadStatus, ParseField};
use crate::ports::{InboundOrdering, LeadRepository, RowLock, StatusUpdate, StepAdvance};

const RECOVERY_REASON: &str = "recovered_unrecognized_status";

/// PostgreSQL implementation of the LeadRepository port.
#[derive(Clone)]
pub struct PostgresLeadRepository {
    pool: PgPool,
}

impl PostgresLeadRepository {
    /// Creates a new PostgresLeadRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, DomainError> {
        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM leads WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch lead", e))?;

        row.map(Lead::try_from).transpose()
    }

    async fn fetch_required(&self, id: &LeadId) -> Result<Lead, DomainError> {
        self.fetch(id).await?.ok_or_else(|| not_found(id))
    }

    /// The status column as stored right now.
    async fn current_status(&self, id: &LeadId) -> Result<Option<LeadStatus>, DomainError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM leads WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to read lead status", e))?;

        Ok(row.map(|(status,)| parse_status(&status)))
    }

    async fn transition_locked(
        &self,
        lead: &Lead,
        to: LeadStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<Lead, LeadError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM leads WHERE id = $1 FOR UPDATE")
            .bind(lead.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to lock lead", e))?;

        let mut fresh = Lead::try_from(row.ok_or(LeadError::NotFound(lead.id))?)?;
        if fresh.status != lead.status && !fresh.status.can_transition_to(&to) {
            // Dropping the transaction rolls back and releases the lock.
            return Err(LeadError::status_changed(lead.status, fresh.status));
        }

        fresh.transition_to(to, reason, now)?;
        write_status_fields(&mut tx, &fresh).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(fresh)
    }
}

/// Database row representation of a lead.
#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    channel_id: String,
    status: String,
    status_reason: Option<String>,
    paused_from: Option<String>,
    current_step: i32,
    parse_failures: serde_json::Value,
    qualification: Option<serde_json::Value>,
    checkout_session_id: Option<String>,
    deposit_amount_pence: Option<i64>,
    offered_slots: serde_json::Value,
    selected_slot: Option<serde_json::Value>,
    last_client_message_at: Option<DateTime<Utc>>,
    last_outbound_message_at: Option<DateTime<Utc>>,
    last_holding_reply_at: Option<DateTime<Utc>>,
    phase_entered_at: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = DomainError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let channel_id = ChannelId::new(row.channel_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid channel_id: {}", e))
        })?;
        let current_step = u32::try_from(row.current_step).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid current_step: {}", row.current_step),
            )
        })?;

        Ok(Lead {
            id: LeadId::from_uuid(row.id),
            channel_id,
            status: parse_status(&row.status),
            status_reason: row.status_reason,
            paused_from: row.paused_from.as_deref().and_then(|s| s.parse().ok()),
            current_step,
            parse_failures: decode_json("parse_failures", row.parse_failures)?,
            qualification: row
                .qualification
                .map(|v| decode_json("qualification", v))
                .transpose()?,
            checkout_session_id: row.checkout_session_id,
            deposit_amount_pence: row.deposit_amount_pence,
            offered_slots: decode_json("offered_slots", row.offered_slots)?,
            selected_slot: row
                .selected_slot
                .map(|v| decode_json("selected_slot", v))
                .transpose()?,
            last_client_message_at: row.last_client_message_at.map(Timestamp::from_datetime),
            last_outbound_message_at: row.last_outbound_message_at.map(Timestamp::from_datetime),
            last_holding_reply_at: row.last_holding_reply_at.map(Timestamp::from_datetime),
            phase_entered_at: decode_json("phase_entered_at", row.phase_entered_at)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Unknown stored values load as `Unrecognized` so the lead can be recovered.
fn parse_status(s: &str) -> LeadStatus {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(stored_status = %s, "Lead has unrecognized status");
        LeadStatus::Unrecognized
    })
}

fn decode_json<T: DeserializeOwned>(column: &str, value: serde_json::Value) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} column: {}", column, e))
    })
}

fn phase_stamp(status: LeadStatus, now: Timestamp) -> Json<BTreeMap<LeadStatus, Timestamp>> {
    Json(BTreeMap::from([(status, now)]))
}

fn step_param(step: u32) -> Result<i32, DomainError> {
    i32::try_from(step).map_err(|_| DomainError::validation("current_step", "step out of range"))
}

fn not_found(id: &LeadId) -> DomainError {
    DomainError::new(ErrorCode::LeadNotFound, format!("Lead not found: {}", id))
}

/// Writes back the columns `Lead::transition_to` may change.
async fn write_status_fields(
    tx: &mut Transaction<'_, Postgres>,
    lead: &Lead,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE leads SET
            status = $2,
            status_reason = $3,
            paused_from = $4,
            current_step = $5,
            parse_failures = $6,
            qualification = $7,
            offered_slots = $8,
            selected_slot = $9,
            phase_entered_at = $10,
            updated_at = $11
        WHERE id = $1
        "#,
    )
    .bind(lead.id.as_uuid())
    .bind(lead.status.as_str())
    .bind(&lead.status_reason)
    .bind(lead.paused_from.map(|s| s.as_str()))
    .bind(step_param(lead.current_step)?)
    .bind(Json(&lead.parse_failures))
    .bind(lead.qualification.as_ref().map(Json))
    .bind(Json(&lead.offered_slots))
    .bind(lead.selected_slot.as_ref().map(Json))
    .bind(Json(&lead.phase_entered_at))
    .bind(lead.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database("Failed to update lead", e))?;

    Ok(())
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn get_or_create(
        &self,
        channel_id: &ChannelId,
        now: Timestamp,
    ) -> Result<(Lead, bool), DomainError> {
        let lead = Lead::new(channel_id.clone(), now);

        let inserted: Option<LeadRow> = sqlx::query_as(
            r#"
            INSERT INTO leads (
                id, channel_id, status, current_step, parse_failures,
                offered_slots, phase_entered_at, created_at, updated_at
            ) VALUES ($1, $2, $3, 0, '{}'::jsonb, '[]'::jsonb, $4, $5, $5)
            ON CONFLICT (channel_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(lead.id.as_uuid())
        .bind(channel_id.as_str())
        .bind(lead.status.as_str())
        .bind(Json(&lead.phase_entered_at))
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to create lead", e))?;

        if let Some(row) = inserted {
            return Ok((Lead::try_from(row)?, true));
        }

        let existing = self.find_by_channel(channel_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Lead for channel {} vanished after conflict", channel_id.as_str()),
            )
        })?;
        Ok((existing, false))
    }

    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, DomainError> {
        self.fetch(id).await
    }

    async fn find_by_channel(&self, channel_id: &ChannelId) -> Result<Option<Lead>, DomainError> {
        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM leads WHERE channel_id = $1")
            .bind(channel_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch lead by channel", e))?;

        row.map(Lead::try_from).transpose()
    }

    async fn transition(
        &self,
        lead: &Lead,
        to: LeadStatus,
        reason: Option<String>,
        lock: RowLock,
        now: Timestamp,
    ) -> Result<Lead, LeadError> {
        check_transition(lead.status, to)?;

        match lock {
            RowLock::Exclusive => self.transition_locked(lead, to, reason, now).await,
            RowLock::Unlocked => {
                match self
                    .update_if_matches(&lead.id, lead.status, to, LeadPatch::new(), reason, now)
                    .await?
                {
                    StatusUpdate::Applied(updated) => Ok(updated),
                    StatusUpdate::Mismatch { actual } => {
                        Err(LeadError::status_changed(lead.status, actual))
                    }
                }
            }
        }
    }

    async fn advance_step_if_at(
        &self,
        id: &LeadId,
        expected_step: u32,
        now: Timestamp,
    ) -> Result<StepAdvance, DomainError> {
        let row: Option<LeadRow> = sqlx::query_as(
            r#"
            UPDATE leads SET
                current_step = current_step + 1,
                updated_at = $3
            WHERE id = $1 AND current_step = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(step_param(expected_step)?)
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to advance step", e))?;

        match row {
            Some(row) => Ok(StepAdvance::Advanced(Lead::try_from(row)?)),
            None => {
                self.fetch_required(id).await?;
                Ok(StepAdvance::AlreadyAdvanced)
            }
        }
    }

    async fn update_if_matches(
        &self,
        id: &LeadId,
        expected: LeadStatus,
        new_status: LeadStatus,
        patch: LeadPatch,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<StatusUpdate, LeadError> {
        check_transition(expected, new_status)?;

        // Mirrors Lead::transition_to followed by Lead::apply_patch.
        let row: Option<LeadRow> = sqlx::query_as(
            r#"
            UPDATE leads SET
                status = $3,
                status_reason = $4,
                paused_from = CASE WHEN $3 = 'needs_human_reply' THEN $2 ELSE NULL END,
                current_step = CASE WHEN $3 = 'new' THEN 0 ELSE current_step END,
                parse_failures = CASE WHEN $3 = 'new' THEN '{}'::jsonb ELSE parse_failures END,
                qualification = COALESCE($5, CASE WHEN $3 = 'new' THEN NULL ELSE qualification END),
                checkout_session_id = COALESCE($6, checkout_session_id),
                deposit_amount_pence = COALESCE($7, deposit_amount_pence),
                offered_slots = COALESCE($8, CASE WHEN $3 = 'new' THEN '[]'::jsonb ELSE offered_slots END),
                selected_slot = COALESCE($9, CASE WHEN $3 = 'new' THEN NULL ELSE selected_slot END),
                phase_entered_at = phase_entered_at || $10,
                updated_at = $11
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(&reason)
        .bind(patch.qualification.as_ref().map(Json))
        .bind(&patch.checkout_session_id)
        .bind(patch.deposit_amount_pence)
        .bind(patch.offered_slots.as_ref().map(Json))
        .bind(patch.selected_slot.as_ref().map(Json))
        .bind(phase_stamp(new_status, now))
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update lead status", e))?;

        if let Some(row) = row {
            return Ok(StatusUpdate::Applied(Lead::try_from(row)?));
        }

        match self.current_status(id).await? {
            Some(actual) => Ok(StatusUpdate::Mismatch { actual }),
            None => Err(LeadError::NotFound(*id)),
        }
    }

    async fn record_inbound(&self, id: &LeadId, at: Timestamp) -> Result<InboundOrdering, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET last_client_message_at = $2
            WHERE id = $1
              AND (last_client_message_at IS NULL OR last_client_message_at <= $2)
            "#,
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record inbound message", e))?;

        if result.rows_affected() > 0 {
            return Ok(InboundOrdering::InOrder);
        }

        let lead = self.fetch_required(id).await?;
        match lead.last_client_message_at {
            Some(last_seen) => Ok(InboundOrdering::OutOfOrder { last_seen }),
            None => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Inbound ordering update for lead {} matched no row", id),
            )),
        }
    }

    async fn record_outbound(&self, id: &LeadId, at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE leads SET last_outbound_message_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to record outbound message", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn claim_holding_reply(
        &self,
        id: &LeadId,
        now: Timestamp,
        min_interval_secs: i64,
    ) -> Result<bool, DomainError> {
        let cutoff = now.minus_secs(min_interval_secs);

        let result = sqlx::query(
            r#"
            UPDATE leads SET last_holding_reply_at = $2
            WHERE id = $1
              AND (last_holding_reply_at IS NULL OR last_holding_reply_at <= $3)
            "#,
        )
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to claim holding reply", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        self.fetch_required(id).await?;
        Ok(false)
    }

    async fn increment_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<u32, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE leads SET parse_failures = jsonb_set(
                parse_failures,
                ARRAY[$2::text],
                to_jsonb(COALESCE((parse_failures ->> $2::text)::int, 0) + 1)
            )
            WHERE id = $1
            RETURNING (parse_failures ->> $2::text)::int
            "#,
        )
        .bind(id.as_uuid())
        .bind(field.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to increment parse failure", e))?;

        let (count,) = row.ok_or_else(|| not_found(id))?;
        u32::try_from(count).map_err(|_| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid failure count: {}", count))
        })
    }

    async fn reset_parse_failure(&self, id: &LeadId, field: ParseField) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE leads SET parse_failures = parse_failures - $2::text WHERE id = $1")
            .bind(id.as_uuid())
            .bind(field.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to reset parse failure", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn find_inactive(
        &self,
        statuses: &[LeadStatus],
        silent_since: Timestamp,
    ) -> Result<Vec<Lead>, DomainError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let rows: Vec<LeadRow> = sqlx::query_as(
            r#"
            SELECT * FROM leads
            WHERE status = ANY($1)
              AND COALESCE(last_client_message_at, created_at) < $2
            ORDER BY created_at
            "#,
        )
        .bind(&statuses)
        .bind(silent_since.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find inactive leads", e))?;

        rows.into_iter().map(Lead::try_from).collect()
    }

    async fn recover_unrecognized_status(&self, id: &LeadId, now: Timestamp) -> Result<Lead, DomainError> {
        let readable: Vec<&str> = LeadStatus::ALL
            .iter()
            .filter(|s| **s != LeadStatus::Unrecognized)
            .map(|s| s.as_str())
            .collect();

        // The one write that bypasses the transition table.
        let row: Option<LeadRow> = sqlx::query_as(
            r#"
            UPDATE leads SET
                status = 'new',
                status_reason = $2,
                paused_from = NULL,
                current_step = 0,
                parse_failures = '{}'::jsonb,
                phase_entered_at = phase_entered_at || $3,
                updated_at = $4
            WHERE id = $1 AND status <> ALL($5)
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(RECOVERY_REASON)
        .bind(phase_stamp(LeadStatus::New, now))
        .bind(now.as_datetime())
        .bind(&readable)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to recover lead status", e))?;

        match row {
            Some(row) => Lead::try_from(row),
            None => {
                let lead = self.fetch_required(id).await?;
                Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!("Lead {} has a readable status: {}", id, lead.status),
                ))
            }
        }
    }
}
