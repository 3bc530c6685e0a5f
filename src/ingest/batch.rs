use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::sink::RecordSink;
use crate::types::ResourceKind;

/// Buffers raw records and flushes them to the sink in bounded batches.
///
/// Exists to cap per-call payload size and amortize per-statement overhead.
/// No retry logic of its own: a flush failure propagates and takes the
/// current polling cycle down with it.
pub struct BatchAccumulator<'a> {
    kind: ResourceKind,
    sink: &'a dyn RecordSink,
    batch_size: usize,
    buf: Vec<Value>,
}

impl<'a> BatchAccumulator<'a> {
    pub fn new(kind: ResourceKind, sink: &'a dyn RecordSink, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            kind,
            sink,
            batch_size,
            buf: Vec::with_capacity(batch_size),
        }
    }

    /// Buffer one record, flushing automatically once the buffer is full.
    /// Returns the rows written by an automatic flush (0 when only buffered).
    pub async fn push(&mut self, record: Value) -> Result<u64> {
        self.buf.push(record);
        if self.buf.len() >= self.batch_size {
            self.flush().await
        } else {
            Ok(0)
        }
    }

    /// Flush whatever remains, even a partial buffer. Empty drain is a no-op
    /// returning 0.
    pub async fn drain(&mut self) -> Result<u64> {
        self.flush().await
    }

    async fn flush(&mut self) -> Result<u64> {
        if self.buf.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(&mut self.buf);
        let written = self.sink.upsert_batch(self.kind, &batch).await?;
        info!(resource = %self.kind, rows = written, "flushed batch");
        Ok(written)
    }
}
