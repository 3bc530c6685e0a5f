use crate::error::{AppError, Result};

pub const KALSHI_BASE_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";

/// Wall-clock timeout for a single HTTP request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 20;

/// Records accumulated before a batch is flushed to the sink.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Markets page size. The Kalshi API caps this at 1000.
pub const MARKETS_PAGE_LIMIT: u32 = 1000;

/// Events page size.
pub const EVENTS_PAGE_LIMIT: u32 = 200;

/// Multi-leg parlays are excluded from market listings.
pub const MVE_FILTER: &str = "exclude";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    /// Bearer token for the Authorization header (KALSHI_API_KEY). Optional;
    /// the public listing endpoints work unauthenticated at lower limits.
    pub api_key: Option<String>,
    /// Outbound request budget (INGEST_RATE_LIMIT_PER_MINUTE, default 120).
    pub rate_limit_per_minute: u32,
    /// Sleep between polling cycles in seconds (INGEST_POLL_INTERVAL, default 60).
    pub poll_interval_secs: u64,
    /// ISO 8601 floor for market creation time (INGEST_MIN_CREATED_TS).
    /// Unset means full listings every cycle.
    pub min_created_ts: Option<String>,
    /// Rows accumulated before flushing to the database (INGEST_BATCH_SIZE, default 500).
    pub batch_size: usize,
    pub database_url: String,
    pub api_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: std::env::var("KALSHI_BASE_URL")
                .unwrap_or_else(|_| KALSHI_BASE_URL.to_string()),
            api_key: std::env::var("KALSHI_API_KEY").ok().filter(|s| !s.is_empty()),
            rate_limit_per_minute: std::env::var("INGEST_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u32>()
                .map_err(|_| {
                    AppError::Config("INGEST_RATE_LIMIT_PER_MINUTE must be an integer".to_string())
                })?,
            poll_interval_secs: std::env::var("INGEST_POLL_INTERVAL")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("INGEST_POLL_INTERVAL must be an integer".to_string())
                })?,
            min_created_ts: std::env::var("INGEST_MIN_CREATED_TS")
                .ok()
                .filter(|s| !s.is_empty()),
            batch_size: std::env::var("INGEST_BATCH_SIZE")
                .unwrap_or_else(|_| DEFAULT_BATCH_SIZE.to_string())
                .parse::<usize>()
                .map_err(|_| AppError::Config("INGEST_BATCH_SIZE must be an integer".to_string()))?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/prediction_markets".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
