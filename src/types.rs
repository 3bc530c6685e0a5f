use std::time::Duration;

use crate::config::{DEFAULT_BATCH_SIZE, EVENTS_PAGE_LIMIT, MARKETS_PAGE_LIMIT};

/// The two resource types this pipeline ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Market,
    Event,
}

impl ResourceKind {
    pub fn spec(self) -> &'static ResourceSpec {
        match self {
            ResourceKind::Market => &MARKETS,
            ResourceKind::Event => &EVENTS,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// Static description of one paginated listing endpoint.
#[derive(Debug)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: &'static str,
    /// Path under the API base URL.
    pub path: &'static str,
    /// Response field holding the record array.
    pub records_field: &'static str,
    pub default_limit: u32,
}

pub static MARKETS: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Market,
    name: "markets",
    path: "/markets",
    records_field: "markets",
    default_limit: MARKETS_PAGE_LIMIT,
};

pub static EVENTS: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Event,
    name: "events",
    path: "/events",
    records_field: "events",
    default_limit: EVENTS_PAGE_LIMIT,
};

/// Per-run knobs for the ingestion loop.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub poll_interval: Duration,
    /// ISO 8601 floor on market creation time; None ingests everything.
    pub min_created_ts: Option<String>,
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            min_created_ts: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
