//! Batched persistence and run-outcome bookkeeping.
//!
//! A failed batch is logged and skipped; later batches still go out. Every
//! batch is an independent natural-key upsert, so a partial write never
//! leaves duplicates behind and a rerun fills the holes.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::PriceStore;
use crate::domain::{PriceRecord, ScrapeOutcome, ScrapeStatus, round_seconds};

/// What reached the store during one or more `persist_records` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistReport {
    pub rows_written: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub last_error: Option<String>,
}

impl PersistReport {
    pub fn absorb(&mut self, other: PersistReport) {
        self.rows_written += other.rows_written;
        self.batches += other.batches;
        self.failed_batches += other.failed_batches;
        if other.last_error.is_some() {
            self.last_error = other.last_error;
        }
    }
}

/// Upsert `records` in batches of `batch_size`.
pub fn persist_records<S: PriceStore + ?Sized>(
    store: &mut S,
    records: &[PriceRecord],
    batch_size: usize,
) -> PersistReport {
    let mut report = PersistReport::default();
    if records.is_empty() {
        warn!("no records to upsert");
        return report;
    }

    for (idx, batch) in records.chunks(batch_size.max(1)).enumerate() {
        report.batches += 1;
        match store.upsert_prices(batch) {
            Ok(n) => {
                report.rows_written += n;
                info!(batch = idx + 1, rows = n, "upserted batch");
            }
            Err(e) => {
                report.failed_batches += 1;
                error!(batch = idx + 1, rows = batch.len(), error = %e, "upsert batch failed");
                report.last_error = Some(e.to_string());
            }
        }
    }
    report
}

/// Append the run's outcome row. Failure is logged, not propagated.
pub fn record_outcome<S: PriceStore + ?Sized>(store: &mut S, outcome: &ScrapeOutcome) -> bool {
    match store.append_outcome(outcome) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "failed to record run outcome");
            false
        }
    }
}

/// Running totals for one ingestion run.
#[derive(Debug, Default)]
pub struct RunTally {
    commodities: HashSet<i64>,
    regions: HashSet<String>,
    persist: PersistReport,
}

impl RunTally {
    /// Count the distinct commodities and regions in a deduplicated set.
    pub fn observe(&mut self, records: &[PriceRecord]) {
        for r in records {
            self.commodities.insert(r.commodity_id);
            if !self.regions.contains(&r.region_code) {
                self.regions.insert(r.region_code.clone());
            }
        }
    }

    pub fn absorb(&mut self, report: PersistReport) {
        self.persist.absorb(report);
    }

    pub fn commodities(&self) -> usize {
        self.commodities.len()
    }

    pub fn regions(&self) -> usize {
        self.regions.len()
    }

    pub fn persist(&self) -> &PersistReport {
        &self.persist
    }

    pub fn outcome(
        &self,
        scrape_date: NaiveDate,
        source: &str,
        min_regions: usize,
        duration_seconds: f64,
    ) -> ScrapeOutcome {
        let status = ScrapeStatus::classify(
            self.persist.rows_written,
            self.regions(),
            min_regions,
            self.persist.failed_batches,
        );
        let error_message = if self.persist.failed_batches > 0 {
            Some(format!(
                "{} of {} upsert batches failed: {}",
                self.persist.failed_batches,
                self.persist.batches,
                self.persist.last_error.as_deref().unwrap_or("unknown error")
            ))
        } else if self.persist.rows_written == 0 {
            Some("no records fetched".to_string())
        } else {
            None
        };

        ScrapeOutcome {
            scrape_date,
            source: source.to_string(),
            status,
            commodities_scraped: self.commodities(),
            provinces_scraped: self.regions(),
            rows_inserted: self.persist.rows_written,
            error_message,
            duration_seconds: round_seconds(duration_seconds),
        }
    }
}
