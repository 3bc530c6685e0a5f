use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::config::{Config, HTTP_TIMEOUT_SECS, MVE_FILTER};
use crate::error::{AppError, Result};
use crate::types::{ResourceKind, ResourceSpec};

pub mod paginate;
pub mod rate_limit;
pub mod retry;

pub use paginate::PageFetcher;
pub use rate_limit::TokenBucket;
pub use retry::RetryPolicy;

/// Rate-limited, retrying HTTP client for the Kalshi trade API.
///
/// Every request costs one token from the bucket; transient failures
/// (429/502/503/504, connect, timeout) are retried with exponential backoff,
/// everything else propagates immediately.
#[derive(Debug)]
pub struct KalshiClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
    bucket: TokenBucket,
    retry: RetryPolicy,
}

enum Attempt {
    Transient(String),
    Fatal(AppError),
}

impl KalshiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        rate_limit_per_minute: u32,
    ) -> Result<Self> {
        if rate_limit_per_minute == 0 {
            return Err(AppError::Config(
                "rate limit must be at least 1 request per minute".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        let refill_rate_per_second = f64::from(rate_limit_per_minute) / 60.0;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            http,
            bucket: TokenBucket::new(f64::from(rate_limit_per_minute), refill_rate_per_second),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.base_url.clone(), cfg.api_key.clone(), cfg.rate_limit_per_minute)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One page of market listings.
    pub async fn get_markets(
        &self,
        limit: u32,
        cursor: Option<&str>,
        min_created_ts: Option<&str>,
    ) -> Result<Value> {
        let mut params = vec![
            ("limit", limit.to_string()),
            ("mve_filter", MVE_FILTER.to_string()),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c.to_string()));
        }
        if let Some(ts) = min_created_ts {
            params.push(("min_created_ts", ts.to_string()));
        }
        self.request("/markets", &params).await
    }

    /// One page of event listings.
    pub async fn get_events(&self, limit: u32, cursor: Option<&str>) -> Result<Value> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(c) = cursor {
            params.push(("cursor", c.to_string()));
        }
        self.request("/events", &params).await
    }

    pub(crate) async fn fetch_page(
        &self,
        spec: &ResourceSpec,
        cursor: Option<&str>,
        min_created_ts: Option<&str>,
    ) -> Result<Value> {
        match spec.kind {
            ResourceKind::Market => {
                self.get_markets(spec.default_limit, cursor, min_created_ts).await
            }
            ResourceKind::Event => self.get_events(spec.default_limit, cursor).await,
        }
    }

    async fn request(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        self.bucket.acquire(1).await;

        let url = format!("{}{}", self.base_url, path);
        let mut last = String::new();
        for attempt in 0..self.retry.max_attempts {
            match self.attempt(&url, params).await {
                Ok(body) => return Ok(body),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Transient(desc)) => {
                    last = desc;
                    if attempt + 1 < self.retry.max_attempts {
                        let backoff = self.retry.backoff(attempt);
                        warn!(
                            url = %url,
                            attempt = attempt + 1,
                            max_attempts = self.retry.max_attempts,
                            "transient failure ({last}); retrying in {backoff:?}"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(AppError::TransientExhausted {
            attempts: self.retry.max_attempts,
            last,
        })
    }

    async fn attempt(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, Attempt> {
        let mut req = self
            .http
            .get(url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    resp.json::<Value>()
                        .await
                        .map_err(|e| Attempt::Fatal(e.into()))
                } else if self.retry.retryable_status(status.as_u16()) {
                    Err(Attempt::Transient(format!("HTTP {}", status.as_u16())))
                } else {
                    let detail = resp.text().await.unwrap_or_default();
                    Err(Attempt::Fatal(AppError::Api {
                        status: status.as_u16(),
                        detail,
                    }))
                }
            }
            Err(e) if self.retry.retryable_error(&e) => Err(Attempt::Transient(e.to_string())),
            Err(e) => Err(Attempt::Fatal(e.into())),
        }
    }
}
