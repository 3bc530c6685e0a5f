//! Typed projections of raw listing records.
//!
//! Field order in the structs, the column constants, and the bind helpers in
//! `postgres.rs` must all agree.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::convert::{as_bool, as_datetime, as_decimal, as_i32, as_i64, as_jsonb, as_text};

/// Insert column order for the `markets` table (excludes the
/// `created_at`/`updated_at` pair, which the statement manages itself).
pub const MARKET_COLUMNS: &[&str] = &[
    "ticker",
    "event_ticker",
    "market_type",
    "title",
    "subtitle",
    "yes_sub_title",
    "no_sub_title",
    "created_time",
    "open_time",
    "close_time",
    "expiration_time",
    "latest_expiration_time",
    "expected_expiration_time",
    "settlement_timer_seconds",
    "status",
    "response_price_units",
    "yes_bid",
    "yes_bid_dollars",
    "yes_ask",
    "yes_ask_dollars",
    "no_bid",
    "no_bid_dollars",
    "no_ask",
    "no_ask_dollars",
    "last_price",
    "last_price_dollars",
    "volume",
    "volume_24h",
    "result",
    "can_close_early",
    "open_interest",
    "notional_value",
    "notional_value_dollars",
    "previous_yes_bid",
    "previous_yes_bid_dollars",
    "previous_yes_ask",
    "previous_yes_ask_dollars",
    "previous_price",
    "previous_price_dollars",
    "liquidity",
    "liquidity_dollars",
    "expiration_value",
    "category",
    "risk_limit_cents",
    "tick_size",
    "rules_primary",
    "rules_secondary",
    "price_level_structure",
    "price_ranges",
    "settlement_value",
    "settlement_value_dollars",
    "fee_waiver_expiration_time",
    "early_close_condition",
    "strike_type",
    "floor_strike",
    "cap_strike",
    "functional_strike",
    "custom_strike",
    "mve_collection_ticker",
    "mve_selected_legs",
    "primary_participant_key",
];

/// Insert column order for the `events` table.
pub const EVENT_COLUMNS: &[&str] = &[
    "event_ticker",
    "series_ticker",
    "sub_title",
    "title",
    "collateral_return_type",
    "mutually_exclusive",
    "category",
    "available_on_brokers",
    "product_metadata",
    "strike_date",
    "strike_period",
    "milestones",
];

#[derive(Debug, Clone)]
pub struct MarketRow {
    pub ticker: String,
    pub event_ticker: Option<String>,
    pub market_type: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub yes_sub_title: Option<String>,
    pub no_sub_title: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub open_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub latest_expiration_time: Option<DateTime<Utc>>,
    pub expected_expiration_time: Option<DateTime<Utc>>,
    pub settlement_timer_seconds: Option<i32>,
    pub status: Option<String>,
    pub response_price_units: Option<String>,
    pub yes_bid: Option<i64>,
    pub yes_bid_dollars: Option<BigDecimal>,
    pub yes_ask: Option<i64>,
    pub yes_ask_dollars: Option<BigDecimal>,
    pub no_bid: Option<i64>,
    pub no_bid_dollars: Option<BigDecimal>,
    pub no_ask: Option<i64>,
    pub no_ask_dollars: Option<BigDecimal>,
    pub last_price: Option<i64>,
    pub last_price_dollars: Option<BigDecimal>,
    pub volume: Option<i64>,
    pub volume_24h: Option<i64>,
    pub result: Option<String>,
    pub can_close_early: Option<bool>,
    pub open_interest: Option<i64>,
    pub notional_value: Option<i64>,
    pub notional_value_dollars: Option<BigDecimal>,
    pub previous_yes_bid: Option<i64>,
    pub previous_yes_bid_dollars: Option<BigDecimal>,
    pub previous_yes_ask: Option<i64>,
    pub previous_yes_ask_dollars: Option<BigDecimal>,
    pub previous_price: Option<i64>,
    pub previous_price_dollars: Option<BigDecimal>,
    pub liquidity: Option<i64>,
    pub liquidity_dollars: Option<BigDecimal>,
    pub expiration_value: Option<String>,
    pub category: Option<String>,
    pub risk_limit_cents: Option<i64>,
    pub tick_size: Option<i64>,
    pub rules_primary: Option<String>,
    pub rules_secondary: Option<String>,
    pub price_level_structure: Option<String>,
    pub price_ranges: Option<Value>,
    pub settlement_value: Option<i64>,
    pub settlement_value_dollars: Option<BigDecimal>,
    pub fee_waiver_expiration_time: Option<DateTime<Utc>>,
    pub early_close_condition: Option<String>,
    pub strike_type: Option<String>,
    pub floor_strike: Option<BigDecimal>,
    pub cap_strike: Option<BigDecimal>,
    pub functional_strike: Option<String>,
    pub custom_strike: Option<Value>,
    pub mve_collection_ticker: Option<String>,
    pub mve_selected_legs: Option<Value>,
    pub primary_participant_key: Option<String>,
}

impl MarketRow {
    /// Project a raw market record. Returns `None` when the identity field is
    /// missing or empty; everything else degrades to NULL on bad input.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let ticker = as_text(raw.get("ticker")).filter(|t| !t.is_empty())?;
        Some(Self {
            ticker,
            event_ticker: as_text(raw.get("event_ticker")),
            market_type: as_text(raw.get("market_type")),
            title: as_text(raw.get("title")),
            subtitle: as_text(raw.get("subtitle")),
            yes_sub_title: as_text(raw.get("yes_sub_title")),
            no_sub_title: as_text(raw.get("no_sub_title")),
            created_time: as_datetime(raw.get("created_time")),
            open_time: as_datetime(raw.get("open_time")),
            close_time: as_datetime(raw.get("close_time")),
            expiration_time: as_datetime(raw.get("expiration_time")),
            latest_expiration_time: as_datetime(raw.get("latest_expiration_time")),
            expected_expiration_time: as_datetime(raw.get("expected_expiration_time")),
            settlement_timer_seconds: as_i32(raw.get("settlement_timer_seconds")),
            status: as_text(raw.get("status")),
            response_price_units: as_text(raw.get("response_price_units")),
            yes_bid: as_i64(raw.get("yes_bid")),
            yes_bid_dollars: as_decimal(raw.get("yes_bid_dollars")),
            yes_ask: as_i64(raw.get("yes_ask")),
            yes_ask_dollars: as_decimal(raw.get("yes_ask_dollars")),
            no_bid: as_i64(raw.get("no_bid")),
            no_bid_dollars: as_decimal(raw.get("no_bid_dollars")),
            no_ask: as_i64(raw.get("no_ask")),
            no_ask_dollars: as_decimal(raw.get("no_ask_dollars")),
            last_price: as_i64(raw.get("last_price")),
            last_price_dollars: as_decimal(raw.get("last_price_dollars")),
            volume: as_i64(raw.get("volume")),
            volume_24h: as_i64(raw.get("volume_24h")),
            result: as_text(raw.get("result")),
            can_close_early: as_bool(raw.get("can_close_early")),
            open_interest: as_i64(raw.get("open_interest")),
            notional_value: as_i64(raw.get("notional_value")),
            notional_value_dollars: as_decimal(raw.get("notional_value_dollars")),
            previous_yes_bid: as_i64(raw.get("previous_yes_bid")),
            previous_yes_bid_dollars: as_decimal(raw.get("previous_yes_bid_dollars")),
            previous_yes_ask: as_i64(raw.get("previous_yes_ask")),
            previous_yes_ask_dollars: as_decimal(raw.get("previous_yes_ask_dollars")),
            previous_price: as_i64(raw.get("previous_price")),
            previous_price_dollars: as_decimal(raw.get("previous_price_dollars")),
            liquidity: as_i64(raw.get("liquidity")),
            liquidity_dollars: as_decimal(raw.get("liquidity_dollars")),
            expiration_value: as_text(raw.get("expiration_value")),
            category: as_text(raw.get("category")),
            risk_limit_cents: as_i64(raw.get("risk_limit_cents")),
            tick_size: as_i64(raw.get("tick_size")),
            rules_primary: as_text(raw.get("rules_primary")),
            rules_secondary: as_text(raw.get("rules_secondary")),
            price_level_structure: as_text(raw.get("price_level_structure")),
            price_ranges: as_jsonb(raw.get("price_ranges")),
            settlement_value: as_i64(raw.get("settlement_value")),
            settlement_value_dollars: as_decimal(raw.get("settlement_value_dollars")),
            fee_waiver_expiration_time: as_datetime(raw.get("fee_waiver_expiration_time")),
            early_close_condition: as_text(raw.get("early_close_condition")),
            strike_type: as_text(raw.get("strike_type")),
            floor_strike: as_decimal(raw.get("floor_strike")),
            cap_strike: as_decimal(raw.get("cap_strike")),
            functional_strike: as_text(raw.get("functional_strike")),
            custom_strike: as_jsonb(raw.get("custom_strike")),
            mve_collection_ticker: as_text(raw.get("mve_collection_ticker")),
            mve_selected_legs: as_jsonb(raw.get("mve_selected_legs")),
            primary_participant_key: as_text(raw.get("primary_participant_key")),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub event_ticker: String,
    pub series_ticker: Option<String>,
    pub sub_title: Option<String>,
    pub title: Option<String>,
    pub collateral_return_type: Option<String>,
    pub mutually_exclusive: Option<bool>,
    pub category: Option<String>,
    pub available_on_brokers: Option<bool>,
    pub product_metadata: Option<Value>,
    pub strike_date: Option<DateTime<Utc>>,
    pub strike_period: Option<String>,
    pub milestones: Option<Value>,
}

impl EventRow {
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let event_ticker = as_text(raw.get("event_ticker")).filter(|t| !t.is_empty())?;
        Some(Self {
            event_ticker,
            series_ticker: as_text(raw.get("series_ticker")),
            sub_title: as_text(raw.get("sub_title")),
            title: as_text(raw.get("title")),
            collateral_return_type: as_text(raw.get("collateral_return_type")),
            mutually_exclusive: as_bool(raw.get("mutually_exclusive")),
            category: as_text(raw.get("category")),
            available_on_brokers: as_bool(raw.get("available_on_brokers")),
            product_metadata: as_jsonb(raw.get("product_metadata")),
            strike_date: as_datetime(raw.get("strike_date")),
            strike_period: as_text(raw.get("strike_period")),
            milestones: as_jsonb(raw.get("milestones")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn market_row_projects_recognized_fields() {
        let raw = json!({
            "ticker": "KXBTC-25DEC31-B100K",
            "event_ticker": "KXBTC-25DEC31",
            "market_type": "binary",
            "title": "Bitcoin above $100k on Dec 31?",
            "status": "active",
            "yes_bid": 40,
            "yes_bid_dollars": "0.40",
            "yes_ask": 43,
            "volume": "125000",
            "can_close_early": true,
            "created_time": "2025-01-15T00:00:00Z",
            "close_time": "2025-12-31T23:59:59Z",
            "settlement_timer_seconds": 3600,
            "floor_strike": "100000.00000001",
            "price_ranges": "[{\"low\": 0, \"high\": 100}]",
            "custom_strike": {"target": "100000"},
        });

        let row = MarketRow::from_raw(&raw).unwrap();
        assert_eq!(row.ticker, "KXBTC-25DEC31-B100K");
        assert_eq!(row.event_ticker.as_deref(), Some("KXBTC-25DEC31"));
        assert_eq!(row.yes_bid, Some(40));
        assert_eq!(
            row.yes_bid_dollars,
            Some(BigDecimal::from_str("0.40").unwrap())
        );
        assert_eq!(row.volume, Some(125_000));
        assert_eq!(row.can_close_early, Some(true));
        assert_eq!(row.created_time.unwrap().timestamp(), 1_736_899_200);
        assert_eq!(row.settlement_timer_seconds, Some(3600));
        assert_eq!(
            row.floor_strike,
            Some(BigDecimal::from_str("100000.00000001").unwrap())
        );
        // Pre-serialized nested payloads are parsed, not stored double-encoded.
        assert_eq!(row.price_ranges, Some(json!([{"low": 0, "high": 100}])));
        assert_eq!(row.custom_strike, Some(json!({"target": "100000"})));
        // Unrecognized/absent fields come out NULL.
        assert_eq!(row.no_bid, None);
        assert_eq!(row.strike_type, None);
    }

    #[test]
    fn malformed_fields_degrade_to_null_without_failing_the_row() {
        let raw = json!({
            "ticker": "MKT-1",
            "yes_bid": "not a number",
            "open_time": "yesterday-ish",
            "liquidity_dollars": [1, 2, 3],
        });
        let row = MarketRow::from_raw(&raw).unwrap();
        assert_eq!(row.yes_bid, None);
        assert_eq!(row.open_time, None);
        assert_eq!(row.liquidity_dollars, None);
    }

    #[test]
    fn market_without_ticker_is_dropped() {
        assert!(MarketRow::from_raw(&json!({"title": "orphan"})).is_none());
        assert!(MarketRow::from_raw(&json!({"ticker": ""})).is_none());
        assert!(MarketRow::from_raw(&json!({"ticker": 42})).is_none());
    }

    #[test]
    fn event_row_projects_recognized_fields() {
        let raw = json!({
            "event_ticker": "KXBTC-25DEC31",
            "series_ticker": "KXBTC",
            "title": "Bitcoin price on Dec 31",
            "mutually_exclusive": true,
            "strike_date": "2025-12-31T00:00:00Z",
            "milestones": [{"name": "open"}],
        });
        let row = EventRow::from_raw(&raw).unwrap();
        assert_eq!(row.event_ticker, "KXBTC-25DEC31");
        assert_eq!(row.series_ticker.as_deref(), Some("KXBTC"));
        assert_eq!(row.mutually_exclusive, Some(true));
        assert_eq!(row.milestones, Some(json!([{"name": "open"}])));
    }

    #[test]
    fn event_without_event_ticker_is_dropped() {
        assert!(EventRow::from_raw(&json!({"title": "orphan"})).is_none());
    }

    #[test]
    fn column_lists_match_projection_width() {
        assert_eq!(MARKET_COLUMNS.len(), 61);
        assert_eq!(EVENT_COLUMNS.len(), 12);
    }
}
