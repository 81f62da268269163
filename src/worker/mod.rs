//! The delivery loop: claim, deliver, record, transition. Runs as one or
//! more independent tasks sharing a `Store`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, Randomness};
use crate::crypto;
use crate::http::{Deliverer, DeliveryOutcome};
use crate::models::ClaimedEvent;
use crate::store::Store;

/// Tuning knobs the worker needs; a narrowed view of `Config` so unit tests
/// don't have to construct a full one.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub webhook_secret: String,
    pub poll_interval: StdDuration,
    pub claim_limit: i64,
    pub max_attempts: i32,
    pub backoff_base_seconds: f64,
    pub backoff_max_seconds: f64,
    pub http_timeout: StdDuration,
}

pub struct Worker {
    store: Store,
    deliverer: Arc<dyn Deliverer>,
    clock: Arc<dyn Clock>,
    randomness: Arc<dyn Randomness>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Store,
        deliverer: Arc<dyn Deliverer>,
        clock: Arc<dyn Clock>,
        randomness: Arc<dyn Randomness>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            deliverer,
            clock,
            randomness,
            config,
        }
    }

    /// Run until `cancellation` fires. Each tick claims up to
    /// `claim_limit` due events (one at a time, so a slow delivery never
    /// blocks other events' locks) and delivers each before sleeping.
    pub async fn run(&self, cancellation: CancellationToken) {
        tracing::info!("webhook worker started");

        loop {
            if cancellation.is_cancelled() {
                tracing::info!("webhook worker shutting down");
                return;
            }

            match self.tick().await {
                Ok(claimed) => {
                    if claimed == 0 {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.poll_interval) => {}
                            _ = cancellation.cancelled() => return,
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("worker tick failed: {e}");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = cancellation.cancelled() => return,
                    }
                }
            }
        }
    }

    /// Claim and deliver up to `claim_limit` due events. Returns how many
    /// were claimed (0 means the store had nothing due right now). Public so
    /// integration tests can drive single ticks deterministically instead of
    /// waiting out `run`'s poll sleep.
    pub async fn tick(&self) -> Result<usize, crate::errors::StoreError> {
        let mut claimed = 0usize;

        for _ in 0..self.config.claim_limit {
            let now = self.clock.now();
            let Some((event, tx)) = self.store.claim_one(now).await? else {
                break;
            };

            claimed += 1;
            self.deliver_one(event, tx).await;
        }

        Ok(claimed)
    }

    /// Deliver one claimed event, record the attempt, and transition its
    /// state - all inside the transaction the claim opened.
    async fn deliver_one(
        &self,
        event: ClaimedEvent,
        mut tx: sqlx::Transaction<'static, sqlx::Postgres>,
    ) {
        let attempt_number = event.attempt_count + 1;
        let body = match serde_json::to_vec(&event.payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("failed to serialize payload for event {}: {e}", event.id);
                let _ = tx.rollback().await;
                return;
            }
        };

        let signature = crypto::sign(&self.config.webhook_secret, &body);
        let headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-Webhook-Signature", signature),
        ];

        let outcome = self
            .deliverer
            .deliver(&event.target_url, body, headers, self.config.http_timeout)
            .await;

        let now = self.clock.now();

        let result = match &outcome {
            DeliveryOutcome::Response {
                status_code,
                body_snippet,
            } if (200..300).contains(status_code) => {
                self.record_success(&mut tx, event.id, attempt_number, *status_code, body_snippet, now)
                    .await
            }
            DeliveryOutcome::Response {
                status_code,
                body_snippet,
            } => {
                let last_error = if body_snippet.is_empty() {
                    format!("HTTP {status_code}: no body")
                } else {
                    format!("HTTP {status_code}: {body_snippet}")
                };
                self.record_failure(
                    &mut tx,
                    event.id,
                    attempt_number,
                    Some(*status_code),
                    Some(body_snippet.as_str()),
                    None,
                    &last_error,
                    now,
                )
                .await
            }
            DeliveryOutcome::TransportError { message } => {
                self.record_failure(&mut tx, event.id, attempt_number, None, None, Some(message.as_str()), message, now)
                    .await
            }
        };

        match result {
            Ok(()) => {
                if let Err(e) = tx.commit().await {
                    tracing::error!("failed to commit delivery of event {}: {e}", event.id);
                }
            }
            Err(e) => {
                tracing::error!("failed to record delivery of event {}: {e}", event.id);
                let _ = tx.rollback().await;
            }
        }
    }

    async fn record_success(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        event_id: uuid::Uuid,
        attempt_number: i32,
        status_code: u16,
        body_snippet: &str,
        now: DateTime<Utc>,
    ) -> Result<(), crate::errors::StoreError> {
        Store::record_attempt(
            tx,
            event_id,
            attempt_number,
            Some(status_code as i32),
            Some(body_snippet),
            None,
            now,
        )
        .await?;
        Store::mark_delivered(tx, event_id, now).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        event_id: uuid::Uuid,
        attempt_number: i32,
        status_code: Option<u16>,
        body_snippet: Option<&str>,
        error: Option<&str>,
        last_error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), crate::errors::StoreError> {
        Store::record_attempt(
            tx,
            event_id,
            attempt_number,
            status_code.map(|c| c as i32),
            body_snippet,
            error,
            now,
        )
        .await?;

        let next_attempt_count = attempt_number;
        let dead = next_attempt_count >= self.config.max_attempts;
        let delay = compute_backoff_seconds(
            self.config.backoff_base_seconds,
            self.config.backoff_max_seconds,
            next_attempt_count,
            self.randomness.uniform(),
        );
        let next_retry_at = now + ChronoDuration::milliseconds((delay * 1000.0) as i64);

        Store::mark_failed(
            tx,
            event_id,
            next_attempt_count,
            next_retry_at,
            last_error,
            dead,
            now,
        )
        .await
    }
}

/// `min(base * 2^attempt + U[0,1), max)`, in seconds.
pub fn compute_backoff_seconds(base: f64, max: f64, attempt: i32, jitter: f64) -> f64 {
    let exponential = base * 2f64.powi(attempt);
    (exponential + jitter).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_until_capped() {
        let attempt1 = compute_backoff_seconds(2.0, 3600.0, 1, 0.0);
        let attempt2 = compute_backoff_seconds(2.0, 3600.0, 2, 0.0);
        assert_eq!(attempt1, 4.0);
        assert_eq!(attempt2, 8.0);
        assert!(attempt2 > attempt1);
    }

    #[test]
    fn backoff_is_capped_at_max() {
        let delay = compute_backoff_seconds(2.0, 100.0, 20, 0.99);
        assert_eq!(delay, 100.0);
    }

    #[test]
    fn backoff_jitter_is_additive_and_bounded_to_one_second() {
        let without_jitter = compute_backoff_seconds(2.0, 3600.0, 3, 0.0);
        let with_jitter = compute_backoff_seconds(2.0, 3600.0, 3, 0.999);
        assert!(with_jitter > without_jitter);
        assert!(with_jitter - without_jitter < 1.0);
    }

    #[test]
    fn dead_letter_threshold_matches_max_attempts() {
        let max_attempts = 3;
        assert!(!(2 >= max_attempts));
        assert!(3 >= max_attempts);
    }
}
