//! Webhook Dispatcher
//!
//! Accepts event submissions over HTTP, persists them, and reliably
//! delivers each payload to its target URL with HMAC auth, bounded
//! retries, exponential backoff, and a dead-letter terminal state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webhook_dispatcher::clock::{SystemClock, SystemRandomness};
use webhook_dispatcher::config::Config;
use webhook_dispatcher::db::Database;
use webhook_dispatcher::http::ReqwestDeliverer;
use webhook_dispatcher::store::Store;
use webhook_dispatcher::worker::{Worker, WorkerConfig};
use webhook_dispatcher::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_dispatcher=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    webhook_dispatcher::errors::set_production_mode(config.is_production());

    tracing::info!("starting webhook dispatcher");
    tracing::info!("environment: {}", config.environment);

    let db = Database::new(&config).await?;
    tracing::info!("database connected");

    db.migrate().await?;
    tracing::info!("migrations complete");

    let store = Store::new(db.pool.clone());
    let cancellation = CancellationToken::new();

    let worker_config = WorkerConfig {
        webhook_secret: config.webhook_secret.clone(),
        poll_interval: Duration::from_secs_f64(config.worker_poll_interval_seconds),
        claim_limit: config.worker_claim_limit,
        max_attempts: config.max_attempts,
        backoff_base_seconds: config.backoff_base_seconds,
        backoff_max_seconds: config.backoff_max_seconds,
        http_timeout: Duration::from_secs(config.http_timeout_seconds),
    };

    let mut worker_handles = Vec::with_capacity(config.worker_count);
    for index in 0..config.worker_count {
        let worker = Worker::new(
            store.clone(),
            Arc::new(ReqwestDeliverer::new()),
            Arc::new(SystemClock),
            Arc::new(SystemRandomness),
            worker_config.clone(),
        );
        let worker_cancellation = cancellation.clone();
        worker_handles.push(tokio::spawn(async move {
            tracing::info!("worker {index} started");
            worker.run(worker_cancellation).await;
        }));
    }

    let state = AppState {
        db,
        store,
        config: config.clone(),
    };

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_cancellation = cancellation.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown_cancellation.cancel();
        })
        .await?;

    for handle in worker_handles {
        let _ = handle.await;
    }

    Ok(())
}
