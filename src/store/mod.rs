//! The persistence layer: row-locked claim, state transitions, and the
//! attempt audit log.
//!
//! `claim_one` claims a single due event inside its own transaction and
//! returns that open transaction to the caller, who must finish it with
//! `record_attempt` + `mark_delivered`/`mark_failed` and then commit (or let
//! it drop, which rolls back and releases the lock). The Worker calls
//! `claim_one` in a loop up to `CLAIM_LIMIT` times per tick rather than
//! selecting a whole batch under one transaction, so that one event's
//! in-flight HTTP call never holds another event's row lock.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{ClaimedEvent, Event};

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new event in `pending` state, immediately eligible for claim.
    pub async fn insert_event(
        &self,
        payload: serde_json::Value,
        target_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (payload, target_url, status, attempt_count, next_retry_at, created_at, updated_at)
            VALUES ($1, $2, 'pending', 0, $3, $3, $3)
            RETURNING id
            "#,
        )
        .bind(&payload)
        .bind(target_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Fetch an event by id, for the debug read endpoint.
    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM webhook_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Claim one due event, locking its row until the returned transaction
    /// commits or rolls back. Returns `None` if nothing is due or every due
    /// row is currently locked by another worker.
    pub async fn claim_one(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<(ClaimedEvent, Transaction<'static, Postgres>)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, ClaimedEvent>(
            r#"
            SELECT id, payload, target_url, attempt_count
            FROM webhook_events
            WHERE status = 'pending'
              AND (next_retry_at IS NULL OR next_retry_at <= $1)
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        match claimed {
            Some(event) => Ok(Some((event, tx))),
            None => Ok(None),
        }
    }

    /// Append one row to the attempt audit log. Must run in the same
    /// transaction as the subsequent `mark_delivered`/`mark_failed` call.
    pub async fn record_attempt(
        tx: &mut Transaction<'static, Postgres>,
        event_id: Uuid,
        attempt_number: i32,
        status_code: Option<i32>,
        response_body: Option<&str>,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO delivery_attempts (event_id, attempt_number, status_code, response_body, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event_id)
        .bind(attempt_number)
        .bind(status_code)
        .bind(response_body)
        .bind(error)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn mark_delivered(
        tx: &mut Transaction<'static, Postgres>,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'delivered', last_error = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn mark_failed(
        tx: &mut Transaction<'static, Postgres>,
        event_id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
        dead: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let status = if dead { "dead" } else { "pending" };
        let stored_next_retry_at = if dead { None } else { Some(next_retry_at) };

        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = $1, attempt_count = $2, next_retry_at = $3, last_error = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(status)
        .bind(attempt_count)
        .bind(stored_next_retry_at)
        .bind(last_error)
        .bind(now)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
