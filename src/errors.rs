//! Application error handling
//!
//! `AppError` is the ingestion-facing error type returned by Axum handlers.
//! `StoreError` is the persistence-facing error type returned by the `store`
//! module; the worker loop logs and absorbs it rather than propagating it.

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Called once at startup with `Config::is_production()` so error responses
/// know whether to hide internal detail. Defaults to hiding detail (the safer
/// side) if never set, e.g. in a unit test that builds an `AppError` directly.
pub fn set_production_mode(is_production: bool) {
    let _ = PRODUCTION_MODE.set(is_production);
}

fn is_production() -> bool {
    *PRODUCTION_MODE.get().unwrap_or(&true)
}

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced to HTTP clients of the ingestion API.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Store(e) => {
                tracing::error!("store error: {:?}", e);
                let message = if is_production() {
                    "a database error occurred".to_string()
                } else {
                    e.to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                let message = if is_production() {
                    "an internal error occurred".to_string()
                } else {
                    msg.clone()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_message(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn hides_internal_detail_until_told_otherwise_then_shows_it() {
        // Nothing has called `set_production_mode` yet in this process, so
        // the default is the safe one: detail hidden.
        let hidden = response_message(
            AppError::Internal("raw secret detail".to_string()).into_response(),
        )
        .await;
        assert_eq!(hidden, "an internal error occurred");

        set_production_mode(false);
        let shown = response_message(
            AppError::Internal("raw secret detail".to_string()).into_response(),
        )
        .await;
        assert_eq!(shown, "raw secret detail");
    }
}
