//! Shared run workflow used by the `daily` and `backfill` subcommands.
//!
//! Everything here is generic over the table source and the store so the
//! whole flow (run, optional refresh, exit status) is testable in memory.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::RunSettings;
use crate::data::codes::CodeTables;
use crate::data::pihps::TableSource;
use crate::domain::{ScrapeOutcome, ScrapeStatus};
use crate::error::AppError;
use crate::ingest::Orchestrator;
use crate::store::PriceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Daily,
    Backfill { days: u32 },
}

impl RunMode {
    pub fn title(&self) -> &'static str {
        match self {
            RunMode::Daily => "daily",
            RunMode::Backfill { .. } => "backfill",
        }
    }
}

/// Execute one ingestion run. The outcome has already been recorded in `store`.
pub fn run_mode<S, P>(
    source: &mut S,
    store: &mut P,
    tables: &CodeTables,
    settings: &RunSettings,
    mode: RunMode,
    today: NaiveDate,
) -> ScrapeOutcome
where
    S: TableSource + ?Sized,
    P: PriceStore + ?Sized,
{
    let mut orchestrator = Orchestrator::new(source, store, tables, settings);
    match mode {
        RunMode::Daily => orchestrator.run_daily(today),
        RunMode::Backfill { days } => orchestrator.run_backfill(today, days),
    }
}

/// Trigger the aggregate refresh.
pub fn refresh<P: PriceStore + ?Sized>(store: &mut P) -> Result<(), AppError> {
    store
        .refresh_aggregates()
        .map_err(|e| AppError::new(1, format!("Refreshing national averages failed: {e}")))?;
    info!("national averages refreshed");
    Ok(())
}

/// Refresh after a run unless the run failed. Returns whether a refresh happened.
pub fn refresh_after<P: PriceStore + ?Sized>(store: &mut P, outcome: &ScrapeOutcome) -> Result<bool, AppError> {
    if outcome.status == ScrapeStatus::Failed {
        warn!("skipping aggregate refresh after failed run");
        return Ok(false);
    }
    refresh(store)?;
    Ok(true)
}

/// Map a recorded outcome to the process result: `failed` exits with code 1.
pub fn check_outcome(outcome: &ScrapeOutcome) -> Result<(), AppError> {
    match outcome.status {
        ScrapeStatus::Failed => Err(AppError::new(
            1,
            format!(
                "Run failed: {}",
                outcome.error_message.as_deref().unwrap_or("no records fetched")
            ),
        )),
        ScrapeStatus::Success | ScrapeStatus::Partial => Ok(()),
    }
}
