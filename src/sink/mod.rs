use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::ResourceKind;

pub mod convert;
pub mod postgres;
pub mod rows;

pub use postgres::PgSink;

/// Destination for raw listing records.
///
/// Implementations own identity extraction, typed projection, and the
/// insert-or-update itself; callers just hand over whole batches. One call is
/// one transactional unit: a failure means nothing from the batch was kept.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Returns the number of rows written. Records missing their identity
    /// field are dropped, so this can be less than `records.len()`. An empty
    /// batch returns 0 without touching storage.
    async fn upsert_batch(&self, kind: ResourceKind, records: &[Value]) -> Result<u64>;
}
