//! Price store: reference lookups, idempotent price upserts, run outcomes.
//!
//! - `supabase`: the production store, spoken to over its REST interface
//! - `memory`: an in-process store with the same upsert semantics
//! - `persist`: batching and outcome bookkeeping on top of any store

pub mod memory;
pub mod persist;
pub mod supabase;

pub use memory::MemoryStore;
pub use persist::{PersistReport, RunTally, persist_records, record_outcome};
pub use supabase::SupabaseStore;

use crate::domain::{CommodityIds, PriceRecord, ScrapeOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store rejected the request: {0}")]
    Rejected(String),
}

/// Storage backend for one ingestion run.
///
/// `upsert_prices` must be idempotent on the natural key and atomic per call;
/// nothing else in the pipeline checks for existing rows.
pub trait PriceStore {
    /// Commodity slug → id, read from the reference table.
    fn load_commodity_ids(&self) -> Result<CommodityIds, StoreError>;

    /// Insert or overwrite `batch`; returns the number of rows sent.
    fn upsert_prices(&mut self, batch: &[PriceRecord]) -> Result<usize, StoreError>;

    /// Append one run outcome. Outcomes are never updated.
    fn append_outcome(&mut self, outcome: &ScrapeOutcome) -> Result<(), StoreError>;

    /// Ask the store to rebuild its derived national-average aggregate.
    fn refresh_aggregates(&mut self) -> Result<(), StoreError>;
}
