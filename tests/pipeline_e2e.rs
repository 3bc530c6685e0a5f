//! End-to-end pipeline tests: a wiremock listing API on one side, an
//! in-memory sink double on the other, the real client/fetcher/batcher/
//! supervisor in between.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kalshi_ingest::client::{KalshiClient, RetryPolicy};
use kalshi_ingest::error::Result;
use kalshi_ingest::ingest::IngestionSupervisor;
use kalshi_ingest::sink::RecordSink;
use kalshi_ingest::types::{IngestOptions, ResourceKind};

/// In-memory stand-in for the Postgres sink, keyed by identity the same way
/// the real tables are. Re-upserting a key overwrites the record, so row
/// counts behave like the database's.
#[derive(Default)]
struct MemorySink {
    markets: Mutex<HashMap<String, Value>>,
    events: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn upsert_batch(&self, kind: ResourceKind, records: &[Value]) -> Result<u64> {
        let (map, key) = match kind {
            ResourceKind::Market => (&self.markets, "ticker"),
            ResourceKind::Event => (&self.events, "event_ticker"),
        };
        let mut map = map.lock().await;
        let mut written = 0u64;
        for record in records {
            let Some(id) = record.get(key).and_then(Value::as_str) else {
                continue;
            };
            map.insert(id.to_string(), record.clone());
            written += 1;
        }
        Ok(written)
    }
}

impl MemorySink {
    async fn market_count(&self) -> usize {
        self.markets.lock().await.len()
    }

    async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }

    async fn market_title(&self, ticker: &str) -> Option<String> {
        self.markets
            .lock()
            .await
            .get(ticker)
            .and_then(|m| m.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

fn market(ticker: &str, title: &str) -> Value {
    json!({"ticker": ticker, "title": title, "status": "active", "yes_bid": 40})
}

fn event(event_ticker: &str) -> Value {
    json!({"event_ticker": event_ticker, "title": "fixture event"})
}

/// Two market pages (5 + 3 records) and one event page (2 records).
async fn mount_fixtures(server: &MockServer, updated_title: &str) {
    let page1: Vec<Value> = (0..5).map(|i| market(&format!("MKT-{i}"), "page one")).collect();
    let mut page2: Vec<Value> = (5..8).map(|i| market(&format!("MKT-{i}"), "page two")).collect();
    page2[0] = market("MKT-5", updated_title);

    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"markets": page1, "cursor": "p2"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param("cursor", "p2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"markets": page2, "cursor": null})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event("EV-A"), event("EV-B")],
            "cursor": null,
        })))
        .mount(server)
        .await;
}

fn test_client(server: &MockServer) -> Arc<KalshiClient> {
    Arc::new(
        KalshiClient::new(server.uri(), None, 60_000)
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 2,
                base_backoff: Duration::from_millis(5),
            }),
    )
}

fn opts() -> IngestOptions {
    IngestOptions {
        // Long enough that tests only ever observe the first cycle.
        poll_interval: Duration::from_secs(3600),
        min_created_ts: None,
        batch_size: 4,
    }
}

async fn wait_for_counts(sink: &MemorySink, markets: usize, events: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if sink.market_count().await == markets && sink.event_count().await == events {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("pipeline did not reach expected row counts in time");
}

#[tokio::test]
async fn one_cycle_writes_every_fixture_row() {
    let server = MockServer::start().await;
    mount_fixtures(&server, "page two").await;

    let sink = Arc::new(MemorySink::default());
    let supervisor = IngestionSupervisor::new(test_client(&server), sink.clone());

    assert!(supervisor.start(opts()).await);
    wait_for_counts(&sink, 8, 2).await;
    supervisor.stop().await;

    assert_eq!(sink.market_count().await, 8);
    assert_eq!(sink.event_count().await, 2);
    assert_eq!(sink.market_title("MKT-0").await.as_deref(), Some("page one"));
    assert_eq!(sink.market_title("MKT-7").await.as_deref(), Some("page two"));
}

#[tokio::test]
async fn second_cycle_updates_in_place_without_growing_row_count() {
    let server = MockServer::start().await;
    mount_fixtures(&server, "page two").await;

    let sink = Arc::new(MemorySink::default());
    let supervisor = IngestionSupervisor::new(test_client(&server), sink.clone());

    supervisor.start(opts()).await;
    wait_for_counts(&sink, 8, 2).await;
    supervisor.stop().await;

    // Same listing, one market retitled.
    server.reset().await;
    mount_fixtures(&server, "revised title").await;

    assert!(supervisor.start(opts()).await, "restart after stop must succeed");
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if sink.market_title("MKT-5").await.as_deref() == Some("revised title") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("second cycle did not update the retitled market");
    supervisor.stop().await;

    assert_eq!(sink.market_count().await, 8, "re-ingestion must not duplicate rows");
    assert_eq!(sink.market_title("MKT-4").await.as_deref(), Some("page one"));
}

#[tokio::test]
async fn start_is_a_noop_while_running_and_stop_is_idempotent() {
    let server = MockServer::start().await;
    mount_fixtures(&server, "page two").await;

    let sink = Arc::new(MemorySink::default());
    let supervisor = IngestionSupervisor::new(test_client(&server), sink.clone());

    assert!(supervisor.start(opts()).await);
    assert!(!supervisor.start(opts()).await, "second start must be a no-op");
    assert!(supervisor.is_running().await);

    supervisor.stop().await;
    assert!(!supervisor.is_running().await);
    // Stopping an idle supervisor does nothing.
    supervisor.stop().await;
}

#[tokio::test]
async fn failed_cycle_leaves_the_loop_alive() {
    let server = MockServer::start().await;
    // Markets listing hard-fails; nothing should be written and the
    // supervisor should survive to report itself running.
    Mock::given(method("GET"))
        .and(path("/markets"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::default());
    let supervisor = IngestionSupervisor::new(test_client(&server), sink.clone());

    supervisor.start(opts()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(supervisor.is_running().await, "cycle failure must not kill the loop");
    assert_eq!(sink.market_count().await, 0);
    assert_eq!(sink.event_count().await, 0);
    supervisor.stop().await;
}

#[tokio::test]
async fn records_without_identity_are_dropped_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "markets": [market("MKT-OK", "kept"), json!({"title": "no ticker"})],
            "cursor": null,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"events": [], "cursor": null})),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::default());
    let supervisor = IngestionSupervisor::new(test_client(&server), sink.clone());

    supervisor.start(opts()).await;
    wait_for_counts(&sink, 1, 0).await;
    supervisor.stop().await;

    assert_eq!(sink.market_title("MKT-OK").await.as_deref(), Some("kept"));
}
