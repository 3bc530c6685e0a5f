use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use tracing::warn;

use super::rows::{EventRow, MarketRow, EVENT_COLUMNS, MARKET_COLUMNS};
use super::RecordSink;
use crate::error::Result;
use crate::types::ResourceKind;

/// Idempotent upsert sink over the `markets` and `events` tables.
///
/// One `upsert_batch` call is one transaction: every record of the flush
/// commits together or not at all. Re-ingesting a known key overwrites all
/// non-key columns and bumps `updated_at`; `created_at` keeps the original
/// observation time.
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_markets(&self, records: &[Value]) -> Result<u64> {
        let rows: Vec<MarketRow> = records
            .iter()
            .filter_map(|raw| {
                let row = MarketRow::from_raw(raw);
                if row.is_none() {
                    warn!("market record missing ticker; dropped");
                }
                row
            })
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = upsert_statement("markets", MARKET_COLUMNS, "ticker");
        let mut tx = self.pool.begin().await?;
        for row in &rows {
            bind_market(sqlx::query(&sql), row).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn upsert_events(&self, records: &[Value]) -> Result<u64> {
        let rows: Vec<EventRow> = records
            .iter()
            .filter_map(|raw| {
                let row = EventRow::from_raw(raw);
                if row.is_none() {
                    warn!("event record missing event_ticker; dropped");
                }
                row
            })
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = upsert_statement("events", EVENT_COLUMNS, "event_ticker");
        let mut tx = self.pool.begin().await?;
        for row in &rows {
            bind_event(sqlx::query(&sql), row).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl RecordSink for PgSink {
    async fn upsert_batch(&self, kind: ResourceKind, records: &[Value]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        match kind {
            ResourceKind::Market => self.upsert_markets(records).await,
            ResourceKind::Event => self.upsert_events(records).await,
        }
    }
}

/// INSERT ... ON CONFLICT statement over the given column list. Non-key
/// columns are overwritten from EXCLUDED and `updated_at` is bumped;
/// `created_at` is never touched after the initial insert.
fn upsert_statement(table: &str, columns: &[&str], key: &str) -> String {
    let col_list = columns.join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|c| **c != key)
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({col_list}) VALUES ({placeholders}) \
         ON CONFLICT ({key}) DO UPDATE SET {updates}, updated_at = now()"
    )
}

/// Bind order must match `MARKET_COLUMNS`.
fn bind_market<'q>(
    q: Query<'q, Postgres, PgArguments>,
    row: &'q MarketRow,
) -> Query<'q, Postgres, PgArguments> {
    q.bind(&row.ticker)
        .bind(&row.event_ticker)
        .bind(&row.market_type)
        .bind(&row.title)
        .bind(&row.subtitle)
        .bind(&row.yes_sub_title)
        .bind(&row.no_sub_title)
        .bind(row.created_time)
        .bind(row.open_time)
        .bind(row.close_time)
        .bind(row.expiration_time)
        .bind(row.latest_expiration_time)
        .bind(row.expected_expiration_time)
        .bind(row.settlement_timer_seconds)
        .bind(&row.status)
        .bind(&row.response_price_units)
        .bind(row.yes_bid)
        .bind(&row.yes_bid_dollars)
        .bind(row.yes_ask)
        .bind(&row.yes_ask_dollars)
        .bind(row.no_bid)
        .bind(&row.no_bid_dollars)
        .bind(row.no_ask)
        .bind(&row.no_ask_dollars)
        .bind(row.last_price)
        .bind(&row.last_price_dollars)
        .bind(row.volume)
        .bind(row.volume_24h)
        .bind(&row.result)
        .bind(row.can_close_early)
        .bind(row.open_interest)
        .bind(row.notional_value)
        .bind(&row.notional_value_dollars)
        .bind(row.previous_yes_bid)
        .bind(&row.previous_yes_bid_dollars)
        .bind(row.previous_yes_ask)
        .bind(&row.previous_yes_ask_dollars)
        .bind(row.previous_price)
        .bind(&row.previous_price_dollars)
        .bind(row.liquidity)
        .bind(&row.liquidity_dollars)
        .bind(&row.expiration_value)
        .bind(&row.category)
        .bind(row.risk_limit_cents)
        .bind(row.tick_size)
        .bind(&row.rules_primary)
        .bind(&row.rules_secondary)
        .bind(&row.price_level_structure)
        .bind(&row.price_ranges)
        .bind(row.settlement_value)
        .bind(&row.settlement_value_dollars)
        .bind(row.fee_waiver_expiration_time)
        .bind(&row.early_close_condition)
        .bind(&row.strike_type)
        .bind(&row.floor_strike)
        .bind(&row.cap_strike)
        .bind(&row.functional_strike)
        .bind(&row.custom_strike)
        .bind(&row.mve_collection_ticker)
        .bind(&row.mve_selected_legs)
        .bind(&row.primary_participant_key)
}

/// Bind order must match `EVENT_COLUMNS`.
fn bind_event<'q>(
    q: Query<'q, Postgres, PgArguments>,
    row: &'q EventRow,
) -> Query<'q, Postgres, PgArguments> {
    q.bind(&row.event_ticker)
        .bind(&row.series_ticker)
        .bind(&row.sub_title)
        .bind(&row.title)
        .bind(&row.collateral_return_type)
        .bind(row.mutually_exclusive)
        .bind(&row.category)
        .bind(row.available_on_brokers)
        .bind(&row.product_metadata)
        .bind(row.strike_date)
        .bind(&row.strike_period)
        .bind(&row.milestones)
}
