use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::KalshiClient;
use crate::config::{EVENTS_PAGE_LIMIT, MARKETS_PAGE_LIMIT};
use crate::error::AppError;
use crate::ingest::IngestionSupervisor;

#[derive(Clone)]
pub struct ApiState {
    pub client: Arc<KalshiClient>,
    pub supervisor: Arc<IngestionSupervisor>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest/list", get(list_ingest))
        .route("/kalshi/markets", get(kalshi_markets))
        .route("/kalshi/events", get(kalshi_events))
        .route("/ws/:market", get(ws_market))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param and response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    now: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PageQuery {
    cursor: Option<String>,
    limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        now: Utc::now(),
    })
}

async fn list_ingest(State(state): State<ApiState>) -> Json<Vec<&'static str>> {
    if state.supervisor.is_running().await {
        Json(vec!["markets_events"])
    } else {
        Json(Vec::new())
    }
}

/// Passthrough to the live listing API, sharing the ingester's rate budget.
async fn kalshi_markets(
    State(state): State<ApiState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let body = state
        .client
        .get_markets(
            params.limit.unwrap_or(MARKETS_PAGE_LIMIT),
            params.cursor.as_deref(),
            None,
        )
        .await?;
    Ok(Json(body))
}

async fn kalshi_events(
    State(state): State<ApiState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let body = state
        .client
        .get_events(params.limit.unwrap_or(EVENTS_PAGE_LIMIT), params.cursor.as_deref())
        .await?;
    Ok(Json(body))
}

async fn ws_market(ws: WebSocketUpgrade, Path(market): Path<String>) -> Response {
    ws.on_upgrade(move |socket| heartbeat(socket, market))
}

/// Heartbeat stub. A push-delivery system would forward stored rows here;
/// for now clients just get a once-a-second pulse until they disconnect.
async fn heartbeat(mut socket: WebSocket, market: String) {
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tick.tick().await;
        let frame = serde_json::json!({
            "market": market,
            "ts": Utc::now().to_rfc3339(),
        });
        if socket.send(Message::Text(frame.to_string())).await.is_err() {
            break;
        }
    }
}
