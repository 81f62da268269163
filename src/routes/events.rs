//! Event ingestion: the thin HTTP surface in front of the `Store`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub payload: JsonValue,
    pub target_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub id: Uuid,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EventStateResponse {
    pub id: Uuid,
    pub status: String,
    pub attempt_count: i32,
    pub next_retry_at: Option<chrono::DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    if !req.payload.is_object() {
        return Err(AppError::Validation(
            "payload must be a JSON object".to_string(),
        ));
    }

    let target_url = req
        .target_url
        .unwrap_or_else(|| state.config.default_target_url.clone());

    if !target_url.starts_with("http://") && !target_url.starts_with("https://") {
        return Err(AppError::Validation(
            "target_url must begin with http:// or https://".to_string(),
        ));
    }

    let id = state
        .store
        .insert_event(req.payload, &target_url, Utc::now())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateEventResponse {
            id,
            status: "accepted",
        }),
    ))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventStateResponse>, AppError> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id}")))?;

    Ok(Json(EventStateResponse {
        id: event.id,
        status: event.status,
        attempt_count: event.attempt_count,
        next_retry_at: event.next_retry_at,
        last_error: event.last_error,
        created_at: event.created_at,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/:id", get(get_event))
}
