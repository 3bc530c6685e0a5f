use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::{KalshiClient, PageFetcher};
use crate::error::Result;
use crate::ingest::batch::BatchAccumulator;
use crate::sink::RecordSink;
use crate::types::{IngestOptions, ResourceKind};

/// Owns the long-lived polling loop and its lifecycle.
///
/// One supervisor runs at most one loop; `start` while running is a no-op and
/// `stop` while idle is a no-op. A failed cycle is logged and retried from
/// scratch on the next iteration; it never kills the loop.
pub struct IngestionSupervisor {
    client: Arc<KalshiClient>,
    sink: Arc<dyn RecordSink>,
    running: Mutex<Option<RunningLoop>>,
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl IngestionSupervisor {
    pub fn new(client: Arc<KalshiClient>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            client,
            sink,
            running: Mutex::new(None),
        }
    }

    /// Spawn the polling loop. Returns false (and changes nothing) when a
    /// loop is already running.
    pub async fn start(&self, opts: IngestOptions) -> bool {
        let mut guard = self.running.lock().await;
        if let Some(run) = guard.as_ref() {
            if !run.handle.is_finished() {
                return false;
            }
        }

        match &opts.min_created_ts {
            Some(ts) => info!(min_created_ts = %ts, "incremental ingestion enabled"),
            None => info!("ingesting full listings (no min_created_ts filter)"),
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.client),
            Arc::clone(&self.sink),
            opts,
            cancel.clone(),
        ));
        *guard = Some(RunningLoop { cancel, handle });
        true
    }

    /// Cancel the loop and wait for it to wind down. Cancellation preempts
    /// the inter-cycle sleep and any in-flight fetch, but not an already
    /// submitted database transaction.
    pub async fn stop(&self) {
        let run = self.running.lock().await.take();
        if let Some(run) = run {
            run.cancel.cancel();
            let _ = run.handle.await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }
}

async fn poll_loop(
    client: Arc<KalshiClient>,
    sink: Arc<dyn RecordSink>,
    opts: IngestOptions,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = run_cycle(&client, sink.as_ref(), &opts) => match result {
                Ok((markets, events)) => {
                    info!(markets, events, "ingestion cycle complete");
                }
                Err(e) => error!("ingestion cycle failed: {e}"),
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(opts.poll_interval) => {}
        }
    }
    info!("ingestion loop stopped");
}

/// One full-refresh cycle: drain all market pages, then all event pages.
async fn run_cycle(
    client: &KalshiClient,
    sink: &dyn RecordSink,
    opts: &IngestOptions,
) -> Result<(u64, u64)> {
    let markets = drain_resource(client, sink, ResourceKind::Market, opts).await?;
    let events = drain_resource(client, sink, ResourceKind::Event, opts).await?;
    Ok((markets, events))
}

async fn drain_resource(
    client: &KalshiClient,
    sink: &dyn RecordSink,
    kind: ResourceKind,
    opts: &IngestOptions,
) -> Result<u64> {
    // The creation-time floor only applies to markets.
    let min_created_ts = match kind {
        ResourceKind::Market => opts.min_created_ts.clone(),
        ResourceKind::Event => None,
    };

    let mut pages = PageFetcher::new(client, kind.spec(), min_created_ts);
    let mut batch = BatchAccumulator::new(kind, sink, opts.batch_size);
    let mut written = 0u64;
    while let Some(records) = pages.next_page().await? {
        for record in records {
            written += batch.push(record).await?;
        }
    }
    written += batch.drain().await?;
    info!(resource = %kind, rows = written, "resource drained");
    Ok(written)
}
