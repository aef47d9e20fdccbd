//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default idle window before a silent socket is treated as closed
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default reminder sweep cadence
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default number of messages fetched per backfill page
const DEFAULT_BACKFILL_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL. When unset the service runs on in-memory storage.
    pub database_url: Option<String>,

    /// JWT validation
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// Realtime channel tuning
    pub idle_timeout_secs: u64,
    pub reminder_sweep_interval_secs: u64,
    pub backfill_page_size: i64,

    /// Comma-separated CORS origins; permissive when unset
    pub cors_allowed_origins: Option<String>,

    /// Runtime configuration
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),

            idle_timeout_secs: parse_or("CHAT_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS),
            reminder_sweep_interval_secs: parse_or(
                "REMINDER_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            ),
            backfill_page_size: parse_or("BACKFILL_PAGE_SIZE", DEFAULT_BACKFILL_PAGE_SIZE)
                .max(1),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "duet=debug".to_string()),
            port: parse_or("PORT", 3000),
        };

        if config.jwt_secret.is_empty() {
            return Err(anyhow::anyhow!("JWT_SECRET must not be empty"));
        }

        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }

    pub fn reminder_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_sweep_interval_secs.max(1))
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
