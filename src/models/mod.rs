//! Core data model: `Event` and `Attempt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted webhook event, as stored in `webhook_events`.
///
/// `status` is one of `"pending"`, `"delivered"`, `"dead"` - stored and
/// compared as plain text rather than a mapped enum type, matching the
/// teacher's own `Job::status` convention.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub payload: JsonValue,
    pub target_url: String,
    pub status: String,
    pub attempt_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of `Event` columns returned by a claim, plus nothing else -
/// workers never need more than this to drive `deliver_one`.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimedEvent {
    pub id: Uuid,
    pub payload: JsonValue,
    pub target_url: String,
    pub attempt_count: i32,
}

/// One row of the append-only `delivery_attempts` audit log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: i64,
    pub event_id: Uuid,
    pub attempt_number: i32,
    pub status_code: Option<i32>,
    pub response_body: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
