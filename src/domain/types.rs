//! Shared domain types.
//!
//! Records are serialized with the column names of the backing store, so the
//! same structs travel from the normalizer straight into upsert payloads.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Retail channel a price was observed in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Traditional,
    Modern,
}

impl MarketType {
    pub const ALL: [MarketType; 2] = [MarketType::Traditional, MarketType::Modern];

    /// Price-type code used by the portal's query parameters.
    pub fn source_code(self) -> &'static str {
        match self {
            MarketType::Traditional => "1",
            MarketType::Modern => "2",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketType::Traditional => "traditional",
            MarketType::Modern => "modern",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized price observation.
///
/// `price` is always finite and strictly positive; the normalizer never
/// constructs a record otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub commodity_id: i64,
    /// Canonical two-digit region code (stored as `province_id`).
    #[serde(rename = "province_id")]
    pub region_code: String,
    pub price: f64,
    pub market_type: MarketType,
    pub date: NaiveDate,
    pub source: String,
}

impl PriceRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            commodity_id: self.commodity_id,
            region_code: self.region_code.clone(),
            date: self.date,
            market_type: self.market_type,
            source: self.source.clone(),
        }
    }
}

/// The five fields that identify one observation in the store.
///
/// Upserts conflict on exactly these columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub commodity_id: i64,
    pub region_code: String,
    pub date: NaiveDate,
    pub market_type: MarketType,
    pub source: String,
}

impl NaturalKey {
    /// Column list for the store's `on_conflict` clause.
    pub const COLUMNS: &'static str = "commodity_id,province_id,date,market_type,source";
}

/// Commodity slug → internal id, loaded once per run from the reference table.
///
/// Owned by a single run and dropped with it; nothing writes to it after load.
#[derive(Debug, Clone, Default)]
pub struct CommodityIds {
    by_slug: HashMap<String, i64>,
}

impl CommodityIds {
    pub fn get(&self, slug: &str) -> Option<i64> {
        self.by_slug.get(slug).copied()
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for CommodityIds {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self {
            by_slug: iter.into_iter().map(|(slug, id)| (slug.into(), id)).collect(),
        }
    }
}

/// Inclusive calendar-date window requested from the ranged endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Number of calendar days covered (both ends included).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Final status of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Partial,
    Failed,
}

impl ScrapeStatus {
    /// Classify a run from what actually reached the store.
    ///
    /// - nothing written → `Failed`
    /// - fewer than `min_regions` regions, or any batch lost → `Partial`
    /// - otherwise → `Success`
    pub fn classify(
        rows_written: usize,
        regions_covered: usize,
        min_regions: usize,
        failed_batches: usize,
    ) -> Self {
        if rows_written == 0 {
            ScrapeStatus::Failed
        } else if regions_covered < min_regions || failed_batches > 0 {
            ScrapeStatus::Partial
        } else {
            ScrapeStatus::Success
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeStatus::Success => "success",
            ScrapeStatus::Partial => "partial",
            ScrapeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only row per run, written to `scrape_logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub scrape_date: NaiveDate,
    pub source: String,
    pub status: ScrapeStatus,
    pub commodities_scraped: usize,
    /// Distinct canonical regions touched.
    pub provinces_scraped: usize,
    pub rows_inserted: usize,
    pub error_message: Option<String>,
    pub duration_seconds: f64,
}

impl ScrapeOutcome {
    /// Outcome for a run that stopped before any fetch was attempted.
    pub fn failed(
        scrape_date: NaiveDate,
        source: impl Into<String>,
        error: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            scrape_date,
            source: source.into(),
            status: ScrapeStatus::Failed,
            commodities_scraped: 0,
            provinces_scraped: 0,
            rows_inserted: 0,
            error_message: Some(error.into()),
            duration_seconds: round_seconds(duration_seconds),
        }
    }
}

/// Durations are stored with centisecond precision.
pub fn round_seconds(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
