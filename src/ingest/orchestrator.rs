//! Ingestion orchestration.
//!
//! Two run modes share the normalize → dedup → persist tail:
//!
//! - **daily**: per market type, try candidate dates (yesterday, then today)
//!   against the point-summary endpoint across every category, keeping the
//!   first date that yields anything. The portal usually publishes a day late.
//! - **backfill**: per market type and region, walk the planned date windows
//!   through the ranged-grid endpoint and persist once the region is done.
//!
//! Individual calls that come back empty (including failed ones, which the
//! client reports as empty) are skipped. Only a failed session or reference
//! load stops a run before it starts; every run appends exactly one outcome.

use std::time::Instant;

use chrono::{Days, NaiveDate};
use tracing::{error, info, warn};

use crate::config::RunSettings;
use crate::data::codes::{CATEGORIES, CodeTables, Region, category_name};
use crate::data::pihps::TableSource;
use crate::domain::{CommodityIds, DateWindow, MarketType, PriceRecord, ScrapeOutcome};
use crate::ingest::dedup::dedup_records;
use crate::ingest::windows::{backfill_span, plan_windows};
use crate::io::normalize::RowNormalizer;
use crate::store::{PriceStore, RunTally, persist_records, record_outcome};

/// Try `candidates` in order and return the first one whose fetch is non-empty.
///
/// Later candidates are never fetched once one succeeds.
pub fn first_non_empty<C: Copy, T>(
    candidates: impl IntoIterator<Item = C>,
    mut fetch: impl FnMut(C) -> Vec<T>,
) -> Option<(C, Vec<T>)> {
    candidates
        .into_iter()
        .map(|c| (c, fetch(c)))
        .find(|(_, found)| !found.is_empty())
}

/// Candidate publication dates for a daily run, most likely first.
pub fn daily_candidates(today: NaiveDate) -> Vec<NaiveDate> {
    today
        .checked_sub_days(Days::new(1))
        .into_iter()
        .chain(std::iter::once(today))
        .collect()
}

pub struct Orchestrator<'a, S: TableSource + ?Sized, P: PriceStore + ?Sized> {
    source: &'a mut S,
    store: &'a mut P,
    tables: &'a CodeTables,
    settings: &'a RunSettings,
}

impl<'a, S: TableSource + ?Sized, P: PriceStore + ?Sized> Orchestrator<'a, S, P> {
    pub fn new(
        source: &'a mut S,
        store: &'a mut P,
        tables: &'a CodeTables,
        settings: &'a RunSettings,
    ) -> Self {
        Self {
            source,
            store,
            tables,
            settings,
        }
    }

    /// Ingest the latest published day for every configured market type.
    pub fn run_daily(&mut self, today: NaiveDate) -> ScrapeOutcome {
        let started = Instant::now();
        info!(%today, "daily run starting");

        let ids = match self.prepare(today, started) {
            Ok(ids) => ids,
            Err(outcome) => return outcome,
        };

        let mut collected = Vec::new();
        for market in self.settings.markets.clone() {
            info!(%market, "scraping market");
            let found = first_non_empty(daily_candidates(today), |date| {
                let records = self.fetch_day(date, market, &ids);
                if records.is_empty() {
                    info!(%market, %date, "no data for date, trying next candidate");
                }
                records
            });
            match found {
                Some((date, records)) => {
                    info!(%market, %date, records = records.len(), "market scraped");
                    collected.extend(records);
                }
                None => warn!(%market, "no candidate date produced data"),
            }
        }

        let unique = dedup_records(collected);
        info!(records = unique.len(), "unique records");

        let mut tally = RunTally::default();
        tally.observe(&unique);
        tally.absorb(persist_records(self.store, &unique, self.settings.batch_size));
        self.finish(&tally, today, started)
    }

    /// Re-ingest the last `days` days region by region.
    pub fn run_backfill(&mut self, today: NaiveDate, days: u32) -> ScrapeOutcome {
        let started = Instant::now();
        let (start, end) = backfill_span(today, days);
        info!(%start, %end, days, "backfill run starting");

        let windows = match plan_windows(start, end, self.settings.chunk_days) {
            Ok(w) => w,
            Err(e) => return self.abort(today, started, e.to_string()),
        };

        let ids = match self.prepare(today, started) {
            Ok(ids) => ids,
            Err(outcome) => return outcome,
        };

        let regions: Vec<Region> = self
            .tables
            .regions()
            .iter()
            .filter(|r| {
                self.settings
                    .regions
                    .as_ref()
                    .is_none_or(|wanted| wanted.contains(&r.source_id))
            })
            .copied()
            .collect();

        let mut tally = RunTally::default();
        for market in self.settings.markets.clone() {
            info!(%market, regions = regions.len(), windows = windows.len(), "backfilling market");
            for region in &regions {
                let records = dedup_records(self.fetch_region(region, market, &windows, &ids));
                if records.is_empty() {
                    warn!(region = region.name, %market, "no records for region");
                    continue;
                }
                tally.observe(&records);
                let report = persist_records(self.store, &records, self.settings.batch_size);
                info!(
                    region = region.name,
                    code = region.code,
                    %market,
                    rows = report.rows_written,
                    "region upserted"
                );
                tally.absorb(report);
            }
        }

        self.finish(&tally, today, started)
    }

    /// Warm the session and load the commodity reference. On failure the
    /// `failed` outcome has already been recorded.
    fn prepare(&mut self, today: NaiveDate, started: Instant) -> Result<CommodityIds, ScrapeOutcome> {
        if let Err(e) = self.source.init_session() {
            error!(error = %e, "session initialization failed");
            return Err(self.abort(today, started, format!("Session init failed: {e}")));
        }
        match self.store.load_commodity_ids() {
            Ok(ids) => Ok(ids),
            Err(e) => {
                error!(error = %e, "commodity reference load failed");
                Err(self.abort(today, started, format!("Commodity reference load failed: {e}")))
            }
        }
    }

    /// Every category's point summary for one date.
    fn fetch_day(&mut self, date: NaiveDate, market: MarketType, ids: &CommodityIds) -> Vec<PriceRecord> {
        let normalizer = RowNormalizer::new(self.tables, &self.settings.source);
        let mut out = Vec::new();
        for (category, _) in CATEGORIES {
            let rows = self.source.fetch_summary(date, category, market);
            if rows.is_empty() {
                warn!(category, name = category_name(category), %date, %market, "no data returned");
                continue;
            }
            let records = normalizer.summary_records(&rows, market, date, ids);
            info!(
                category,
                name = category_name(category),
                rows = rows.len(),
                records = records.len(),
                "category fetched"
            );
            out.extend(records);
        }
        out
    }

    /// Every planned window of the ranged grid for one region.
    fn fetch_region(
        &mut self,
        region: &Region,
        market: MarketType,
        windows: &[DateWindow],
        ids: &CommodityIds,
    ) -> Vec<PriceRecord> {
        let normalizer = RowNormalizer::new(self.tables, &self.settings.source);
        let mut out = Vec::new();
        for window in windows {
            let rows = self.source.fetch_grid(*window, region.source_id, market);
            let records = normalizer.grid_rows(&rows, region.code, market, ids);
            info!(
                region = region.name,
                code = region.code,
                %window,
                %market,
                records = records.len(),
                "window fetched"
            );
            out.extend(records);
        }
        out
    }

    fn abort(&mut self, today: NaiveDate, started: Instant, message: String) -> ScrapeOutcome {
        let outcome = ScrapeOutcome::failed(
            today,
            self.settings.source.as_str(),
            message,
            started.elapsed().as_secs_f64(),
        );
        record_outcome(self.store, &outcome);
        outcome
    }

    fn finish(&mut self, tally: &RunTally, today: NaiveDate, started: Instant) -> ScrapeOutcome {
        let outcome = tally.outcome(
            today,
            &self.settings.source,
            self.settings.min_regions,
            started.elapsed().as_secs_f64(),
        );
        record_outcome(self.store, &outcome);
        info!(
            status = %outcome.status,
            commodities = outcome.commodities_scraped,
            regions = outcome.provinces_scraped,
            rows = outcome.rows_inserted,
            duration = outcome.duration_seconds,
            "run complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::codes::REGIONS;
    use crate::data::pihps::{FetchError, GridRow, SummaryRow};
    use crate::domain::ScrapeStatus;
    use crate::store::MemoryStore;
    use reqwest::StatusCode;
    use serde_json::{Map, json};
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Session,
        Summary(NaiveDate, u8, MarketType),
        Grid(DateWindow, u32, MarketType),
    }

    /// Scripted portal: summaries are looked up by (date, category, market);
    /// grids produce one leaf row priced per day for every known region.
    #[derive(Default)]
    struct FakePortal {
        session_down: bool,
        summaries: HashMap<(NaiveDate, u8, MarketType), Vec<SummaryRow>>,
        timed_out_summaries: HashSet<(NaiveDate, u8)>,
        timed_out_grids: HashSet<(u32, NaiveDate)>,
        calls: Vec<Call>,
    }

    impl FakePortal {
        fn all_regions(&mut self, date: NaiveDate, category: u8, market: MarketType, name: &str, price: f64) {
            let rows = REGIONS
                .iter()
                .map(|r| SummaryRow {
                    region_id: json!(r.source_id),
                    commodity: Some(name.to_string()),
                    value: json!(price),
                })
                .collect();
            self.summaries.insert((date, category, market), rows);
        }

        fn fetch_calls(&self) -> usize {
            self.calls.iter().filter(|c| **c != Call::Session).count()
        }
    }

    impl TableSource for FakePortal {
        fn init_session(&mut self) -> Result<(), FetchError> {
            self.calls.push(Call::Session);
            if self.session_down {
                return Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(())
        }

        fn fetch_summary(&mut self, date: NaiveDate, category: u8, market: MarketType) -> Vec<SummaryRow> {
            self.calls.push(Call::Summary(date, category, market));
            if self.timed_out_summaries.contains(&(date, category)) {
                return Vec::new();
            }
            self.summaries.get(&(date, category, market)).cloned().unwrap_or_default()
        }

        fn fetch_grid(&mut self, window: DateWindow, region_id: u32, market: MarketType) -> Vec<GridRow> {
            self.calls.push(Call::Grid(window, region_id, market));
            if self.timed_out_grids.contains(&(region_id, window.start)) {
                return Vec::new();
            }
            let mut columns = Map::new();
            columns.insert("no".to_string(), json!(1));
            let mut day = window.start;
            while day <= window.end {
                columns.insert(day.format("%d/%m/%Y").to_string(), json!("14,450"));
                day = day.succ_opt().unwrap();
            }
            vec![
                GridRow {
                    name: Some("Beras".to_string()),
                    level: json!(1),
                    columns: columns.clone(),
                },
                GridRow {
                    name: Some("Beras Kualitas Bawah I".to_string()),
                    level: json!(2),
                    columns,
                },
            ]
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with_commodities([("beras-kualitas-bawah-i", 1), ("telur-ayam-ras-segar", 10)])
    }

    fn today() -> NaiveDate {
        day(2026, 2, 28)
    }

    #[test]
    fn first_non_empty_short_circuits() {
        let mut tried = Vec::new();
        let found = first_non_empty([1, 2, 3], |c| {
            tried.push(c);
            if c >= 2 { vec![c * 10] } else { Vec::new() }
        });
        assert_eq!(found, Some((2, vec![20])));
        assert_eq!(tried, vec![1, 2]);

        let none: Option<(i32, Vec<i32>)> = first_non_empty([1, 2], |_| Vec::new());
        assert_eq!(none, None);
    }

    #[test]
    fn daily_candidates_are_yesterday_then_today() {
        assert_eq!(daily_candidates(today()), vec![day(2026, 2, 27), today()]);
    }

    #[test]
    fn daily_stops_at_first_date_with_data() {
        let yesterday = day(2026, 2, 27);
        let mut portal = FakePortal::default();
        portal.all_regions(yesterday, 4, MarketType::Traditional, "Telur Ayam Ras Segar", 28_000.0);
        portal.all_regions(today(), 4, MarketType::Traditional, "Telur Ayam Ras Segar", 99_000.0);
        portal.all_regions(today(), 4, MarketType::Modern, "Telur Ayam Ras Segar", 30_000.0);

        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings::default();
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_daily(today());

        // Traditional: 10 categories for yesterday only. Modern: yesterday empty, then today.
        assert_eq!(portal.fetch_calls(), 30);
        assert!(!portal.calls.contains(&Call::Summary(today(), 4, MarketType::Traditional)));

        assert_eq!(outcome.status, ScrapeStatus::Success);
        assert_eq!(outcome.rows_inserted, 68);
        assert_eq!(outcome.provinces_scraped, 34);
        assert_eq!(outcome.commodities_scraped, 1);
        assert_eq!(outcome.scrape_date, today());

        let prices: Vec<f64> = store
            .prices()
            .iter()
            .filter(|r| r.market_type == MarketType::Traditional)
            .map(|r| r.price)
            .collect();
        assert_eq!(prices.len(), 34);
        assert!(prices.iter().all(|p| *p == 28_000.0));
        assert_eq!(store.outcomes(), &[outcome]);
    }

    #[test]
    fn timed_out_category_does_not_stop_the_run() {
        let yesterday = day(2026, 2, 27);
        let mut portal = FakePortal::default();
        portal.all_regions(yesterday, 1, MarketType::Traditional, "Beras Kualitas Bawah I", 14_450.0);
        portal.all_regions(yesterday, 4, MarketType::Traditional, "Telur Ayam Ras Segar", 28_000.0);
        portal.timed_out_summaries.insert((yesterday, 1));

        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings {
            markets: vec![MarketType::Traditional],
            ..RunSettings::default()
        };
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_daily(today());

        assert_eq!(portal.fetch_calls(), 10);
        assert_eq!(outcome.rows_inserted, 34);
        assert_eq!(outcome.commodities_scraped, 1);
        assert!(store.prices().iter().all(|r| r.commodity_id == 10));
    }

    #[test]
    fn session_failure_records_failed_outcome_without_fetching() {
        let mut portal = FakePortal {
            session_down: true,
            ..FakePortal::default()
        };
        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings::default();
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_daily(today());

        assert_eq!(outcome.status, ScrapeStatus::Failed);
        assert!(outcome.error_message.as_deref().unwrap().starts_with("Session init failed"));
        assert_eq!(portal.fetch_calls(), 0);
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(store.outcomes().len(), 1);
    }

    #[test]
    fn reference_failure_records_failed_outcome_without_fetching() {
        let mut portal = FakePortal::default();
        let mut store = store();
        store.fail_reference_load();
        let tables = CodeTables::standard();
        let settings = RunSettings::default();
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_backfill(today(), 14);

        assert_eq!(outcome.status, ScrapeStatus::Failed);
        assert_eq!(portal.fetch_calls(), 0);
        assert_eq!(store.outcomes().len(), 1);
    }

    #[test]
    fn empty_portal_is_a_failed_run() {
        let mut portal = FakePortal::default();
        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings::default();
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_daily(today());

        assert_eq!(portal.fetch_calls(), 40);
        assert_eq!(outcome.status, ScrapeStatus::Failed);
        assert_eq!(outcome.error_message.as_deref(), Some("no records fetched"));
        assert_eq!(store.upsert_calls(), 0);
    }

    #[test]
    fn few_regions_is_partial() {
        let yesterday = day(2026, 2, 27);
        let mut portal = FakePortal::default();
        let rows: Vec<SummaryRow> = (1..=5)
            .map(|id| SummaryRow {
                region_id: json!(id),
                commodity: Some("Telur Ayam Ras Segar".to_string()),
                value: json!("28,000"),
            })
            .collect();
        portal.summaries.insert((yesterday, 4, MarketType::Traditional), rows);

        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings::default();
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_daily(today());

        assert_eq!(outcome.status, ScrapeStatus::Partial);
        assert_eq!(outcome.provinces_scraped, 5);
        assert_eq!(outcome.rows_inserted, 5);
    }

    #[test]
    fn backfill_walks_windows_per_region_and_skips_failures() {
        let mut portal = FakePortal::default();
        // 13 days back → 14 days → two 7-day windows.
        let (start, _) = backfill_span(today(), 13);
        portal.timed_out_grids.insert((13, start));

        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings {
            regions: Some(vec![12, 13]),
            ..RunSettings::default()
        };
        let outcome =
            Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_backfill(today(), 13);

        // 2 markets × 2 regions × 2 windows, including the one that timed out.
        assert_eq!(portal.fetch_calls(), 8);
        // One upsert per (market, region).
        assert_eq!(store.upsert_calls(), 4);

        let jakarta = store.prices().iter().filter(|r| r.region_code == "31").count();
        let west_java = store.prices().iter().filter(|r| r.region_code == "32").count();
        assert_eq!(west_java, 2 * 14);
        assert_eq!(jakarta, 2 * 7);

        assert!(store.prices().iter().all(|r| r.commodity_id == 1 && r.price == 14_450.0));
        assert!(store.prices().iter().all(|r| r.date >= start && r.date <= today()));

        assert_eq!(outcome.rows_inserted, 42);
        assert_eq!(outcome.provinces_scraped, 2);
        assert_eq!(outcome.status, ScrapeStatus::Partial);
        assert_eq!(store.outcomes().len(), 1);
    }

    #[test]
    fn repeated_backfill_is_idempotent() {
        let tables = CodeTables::standard();
        let settings = RunSettings {
            regions: Some(vec![1, 2, 3]),
            ..RunSettings::default()
        };
        let mut store = store();

        let mut portal = FakePortal::default();
        Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_backfill(today(), 20);
        let first: Vec<PriceRecord> = store.prices().into_iter().cloned().collect();

        let mut portal = FakePortal::default();
        Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_backfill(today(), 20);
        let second: Vec<PriceRecord> = store.prices().into_iter().cloned().collect();

        assert_eq!(first.len(), 3 * 2 * 21);
        assert_eq!(first, second);
        assert_eq!(store.outcomes().len(), 2);
    }

    #[test]
    fn full_backfill_covers_every_region() {
        let mut portal = FakePortal::default();
        let mut store = store();
        let tables = CodeTables::standard();
        let settings = RunSettings {
            markets: vec![MarketType::Modern],
            ..RunSettings::default()
        };
        let outcome = Orchestrator::new(&mut portal, &mut store, &tables, &settings).run_backfill(today(), 6);

        assert_eq!(portal.fetch_calls(), 34);
        assert_eq!(outcome.provinces_scraped, 34);
        assert_eq!(outcome.status, ScrapeStatus::Success);
        let grid_regions: HashSet<u32> = portal
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Grid(_, id, _) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(grid_regions.len(), 34);
    }
}
