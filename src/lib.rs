//! Webhook dispatcher - library exports for the binary and integration tests.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod db;
pub mod errors;
pub mod http;
pub mod models;
pub mod routes;
pub mod store;
pub mod worker;

/// Application state shared across all ingestion routes.
#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub store: store::Store,
    pub config: config::Config,
}
