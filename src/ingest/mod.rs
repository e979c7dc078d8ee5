//! Ingestion pipeline: window planning, orchestration, deduplication.
//!
//! Flow: windows / categories → orchestrator → client → normalizer → dedup →
//! persister → outcome row.

pub mod dedup;
pub mod orchestrator;
pub mod windows;

pub use dedup::dedup_records;
pub use orchestrator::{Orchestrator, first_non_empty};
pub use windows::{backfill_span, plan_windows};
