use serde_json::Value;

use super::KalshiClient;
use crate::error::Result;
use crate::types::ResourceSpec;

/// Cursor-driven page iterator over one listing resource.
///
/// A fresh fetcher always starts from the beginning of the listing; cursors
/// are never carried across polling cycles. The sequence ends when the server
/// stops returning a cursor. Records are passed through as-is; deduplication
/// is the sink's job via upsert identity.
pub struct PageFetcher<'a> {
    client: &'a KalshiClient,
    spec: &'static ResourceSpec,
    min_created_ts: Option<String>,
    cursor: Option<String>,
    done: bool,
}

impl<'a> PageFetcher<'a> {
    pub fn new(
        client: &'a KalshiClient,
        spec: &'static ResourceSpec,
        min_created_ts: Option<String>,
    ) -> Self {
        Self {
            client,
            spec,
            min_created_ts,
            cursor: None,
            done: false,
        }
    }

    /// The next page of raw records, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }
        let body = self
            .client
            .fetch_page(self.spec, self.cursor.as_deref(), self.min_created_ts.as_deref())
            .await?;

        let records = body
            .get(self.spec.records_field)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // null, absent, or empty cursor all terminate the listing.
        self.cursor = body
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if self.cursor.is_none() {
            self.done = true;
        }

        Ok(Some(records))
    }
}
