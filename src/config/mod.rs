//! Application configuration

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    // Server
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,

    // Signing
    pub webhook_secret: String,
    pub default_target_url: String,

    // Delivery tuning
    pub http_timeout_seconds: u64,
    pub worker_poll_interval_seconds: f64,
    pub worker_claim_limit: i64,
    pub worker_count: usize,
    pub max_attempts: i32,
    pub backoff_base_seconds: f64,
    pub backoff_max_seconds: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL required")?,

            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            default_target_url: std::env::var("TARGET_URL")
                .unwrap_or_else(|_| "http://localhost:8080/webhook".to_string()),

            http_timeout_seconds: parse_env_or("HTTP_TIMEOUT", 15),
            worker_poll_interval_seconds: parse_env_or("WORKER_POLL_INTERVAL", 1.5),
            worker_claim_limit: parse_env_or("WORKER_CLAIM_LIMIT", 10),
            worker_count: parse_env_or("WORKER_COUNT", 1),
            max_attempts: parse_env_or("MAX_ATTEMPTS", 20),
            backoff_base_seconds: parse_env_or("BACKOFF_BASE_SECONDS", 2.0),
            backoff_max_seconds: parse_env_or("BACKOFF_MAX_SECONDS", 3600.0),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Parse an env var with a typed default, falling back silently on a bad value
/// (matches the teacher's `unwrap_or` convention for non-critical tuning knobs).
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
