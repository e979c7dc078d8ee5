//! Domain types used throughout the ingestion pipeline.
//!
//! This module defines:
//!
//! - the market-type dimension (`MarketType`)
//! - the canonical unit of ingestion (`PriceRecord`) and its `NaturalKey`
//! - per-run reference state (`CommodityIds`)
//! - run outcome records (`ScrapeOutcome`, `ScrapeStatus`)
//! - date windows for the ranged endpoint (`DateWindow`)

pub mod types;

pub use types::*;
