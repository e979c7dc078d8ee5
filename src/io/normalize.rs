//! Row normalization: raw portal rows → canonical `PriceRecord`s.
//!
//! Rows are dropped, never failed, when:
//! - the region or commodity is not in the code tables
//! - the commodity slug has no id in this run's reference cache
//! - the value is a placeholder, unparseable, zero, or negative
//!
//! Drops are logged at debug level only; a payload routinely carries a few.

use chrono::NaiveDate;
use tracing::debug;

use crate::data::codes::CodeTables;
use crate::data::pihps::{GridRow, SummaryRow};
use crate::domain::{CommodityIds, MarketType, PriceRecord};
use crate::io::parse::{parse_date_column, parse_price_value};

/// Grid rows at this level are category headers.
const HEADER_LEVEL: u32 = 1;

pub struct RowNormalizer<'a> {
    tables: &'a CodeTables,
    source: &'a str,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(tables: &'a CodeTables, source: &'a str) -> Self {
        Self { tables, source }
    }

    /// Point-summary row → at most one record.
    pub fn summary_record(
        &self,
        row: &SummaryRow,
        market: MarketType,
        date: NaiveDate,
        ids: &CommodityIds,
    ) -> Option<PriceRecord> {
        let source_id = row.region_id()?;
        let Some(region_code) = self.tables.region_code(source_id) else {
            debug!(source_id, "unknown region id");
            return None;
        };
        let name = row.commodity.as_deref()?;
        let commodity_id = self.resolve_commodity(name, ids)?;
        let price = positive(parse_price_value(&row.value))?;

        Some(self.record(commodity_id, region_code, price, market, date))
    }

    pub fn summary_records(
        &self,
        rows: &[SummaryRow],
        market: MarketType,
        date: NaiveDate,
        ids: &CommodityIds,
    ) -> Vec<PriceRecord> {
        rows.iter()
            .filter_map(|row| self.summary_record(row, market, date, ids))
            .collect()
    }

    /// Ranged-grid row → one record per usable date column.
    ///
    /// The region comes from the request, not from the row.
    pub fn grid_records(
        &self,
        row: &GridRow,
        region_code: &str,
        market: MarketType,
        ids: &CommodityIds,
    ) -> Vec<PriceRecord> {
        if row.level() == Some(HEADER_LEVEL) {
            return Vec::new();
        }
        let Some(name) = row.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return Vec::new();
        };
        let Some(commodity_id) = self.resolve_commodity(name, ids) else {
            return Vec::new();
        };

        row.columns
            .iter()
            .filter_map(|(key, value)| {
                let date = parse_date_column(key)?;
                let price = positive(parse_price_value(value))?;
                Some(self.record(commodity_id, region_code, price, market, date))
            })
            .collect()
    }

    pub fn grid_rows(
        &self,
        rows: &[GridRow],
        region_code: &str,
        market: MarketType,
        ids: &CommodityIds,
    ) -> Vec<PriceRecord> {
        rows.iter()
            .flat_map(|row| self.grid_records(row, region_code, market, ids))
            .collect()
    }

    fn resolve_commodity(&self, name: &str, ids: &CommodityIds) -> Option<i64> {
        let Some(slug) = self.tables.commodity_slug(name) else {
            debug!(name, "unknown commodity name");
            return None;
        };
        let id = ids.get(slug);
        if id.is_none() {
            debug!(slug, "commodity slug missing from reference table");
        }
        id
    }

    fn record(
        &self,
        commodity_id: i64,
        region_code: &str,
        price: f64,
        market: MarketType,
        date: NaiveDate,
    ) -> PriceRecord {
        PriceRecord {
            commodity_id,
            region_code: region_code.to_string(),
            price,
            market_type: market,
            date,
            source: self.source.to_string(),
        }
    }
}

fn positive(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}
