//! Kalshi market/event ingestion service.
//!
//! Periodically pulls the `/markets` and `/events` listings through a
//! rate-limited, retrying HTTP client, walks their cursor-based pagination,
//! and upserts typed rows into PostgreSQL in bounded batches. A small axum
//! API exposes health, ingestion status, and listing passthrough.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod sink;
pub mod types;
