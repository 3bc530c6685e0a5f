use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kalshi_ingest::api::routes::{router, ApiState};
use kalshi_ingest::client::KalshiClient;
use kalshi_ingest::config::Config;
use kalshi_ingest::error::Result;
use kalshi_ingest::ingest::IngestionSupervisor;
use kalshi_ingest::sink::PgSink;
use kalshi_ingest::types::IngestOptions;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::PgPool::connect(&cfg.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready");

    // --- Ingestion pipeline ---
    let client = Arc::new(KalshiClient::from_config(&cfg)?);
    let supervisor = Arc::new(IngestionSupervisor::new(
        Arc::clone(&client),
        Arc::new(PgSink::new(pool.clone())),
    ));
    supervisor
        .start(IngestOptions {
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            min_created_ts: cfg.min_created_ts.clone(),
            batch_size: cfg.batch_size,
        })
        .await;
    info!(
        poll_interval_secs = cfg.poll_interval_secs,
        rate_limit_per_minute = cfg.rate_limit_per_minute,
        "Ingestion started"
    );

    // --- HTTP API server ---
    let state = ApiState {
        client,
        supervisor: Arc::clone(&supervisor),
    };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.stop().await;
    info!("Ingestion stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
