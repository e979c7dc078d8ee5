//! Client for the government food-price portal's table endpoints.
//!
//! Two JSON endpoints are used:
//!
//! - **point summary** (`GetGridData1`): one day, one commodity category, one
//!   market type, all regions
//! - **ranged grid** (`GetGridDataDaerah`): one region, one market type, a
//!   window of days pivoted into `DD/MM/YYYY` columns
//!
//! Both reject requests that lack the cookies handed out by the landing page,
//! so [`TableSource::init_session`] must succeed first. Every request is
//! followed by a fixed pause; the portal starts refusing clients that poll it
//! back to back.
//!
//! Per-call failures stop at this boundary: a slice that cannot be fetched is
//! logged and returned as an empty row list.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientSettings;
use crate::domain::{DateWindow, MarketType};
use crate::error::AppError;
use crate::io::parse::parse_id;

const SUMMARY_PATH: &str = "WebSite/Home/GetGridData1";
const GRID_PATH: &str = "WebSite/TabelHarga/GetGridDataDaerah";
/// `provId` value meaning "every region".
const ALL_REGIONS: &str = "0";
/// `tipe_laporan` value for the daily price table.
const DAILY_REPORT: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of a point-summary payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRow {
    /// Portal region id (number or numeric string).
    #[serde(rename = "ProvID", default)]
    pub region_id: Value,
    #[serde(rename = "Komoditas", default)]
    pub commodity: Option<String>,
    #[serde(rename = "Nilai", default)]
    pub value: Value,
}

impl SummaryRow {
    pub fn region_id(&self) -> Option<u32> {
        parse_id(&self.region_id)
    }
}

/// One row of a ranged-grid payload.
///
/// `level` 1 rows are category headers, `level` 2 rows are commodities. All
/// other keys (`no`, and one `DD/MM/YYYY` key per day) land in `columns`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: Value,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl GridRow {
    pub fn level(&self) -> Option<u32> {
        parse_id(&self.level)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Source of raw price tables.
///
/// Implemented by [`PihpsClient`]; tests script their own.
pub trait TableSource {
    /// Acquire session state. Failure aborts the run before any fetch.
    fn init_session(&mut self) -> Result<(), FetchError>;

    /// Point summary for one day and category, all regions. Empty on failure.
    fn fetch_summary(&mut self, date: NaiveDate, category: u8, market: MarketType) -> Vec<SummaryRow>;

    /// Ranged grid for one region over `window`. Empty on failure.
    fn fetch_grid(&mut self, window: DateWindow, region_id: u32, market: MarketType) -> Vec<GridRow>;
}

pub struct PihpsClient {
    client: Client,
    settings: ClientSettings,
}

impl PihpsClient {
    pub fn new(settings: ClientSettings) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        let referer = HeaderValue::from_str(&settings.base_url)
            .map_err(|e| AppError::config(format!("Invalid portal base URL: {e}")))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url, path)
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    /// GET a table endpoint and return its `data` array, pausing afterwards.
    fn get_rows(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<Vec<Value>, FetchError> {
        let result = self
            .client
            .get(self.url(path))
            .query(query)
            .timeout(timeout)
            .send()
            .map_err(FetchError::from)
            .and_then(|resp| {
                let status = resp.status();
                if status != StatusCode::OK {
                    return Err(FetchError::Status(status));
                }
                let body = resp.text()?;
                parse_envelope(&body)
            });
        self.pause(self.settings.request_delay);
        result
    }
}

impl TableSource for PihpsClient {
    fn init_session(&mut self) -> Result<(), FetchError> {
        info!(url = %self.settings.base_url, "initializing portal session");
        let resp = self
            .client
            .get(&self.settings.base_url)
            .timeout(self.settings.warmup_timeout)
            .send()?;
        let status = resp.status();
        info!(status = status.as_u16(), "landing page visited");
        self.pause(self.settings.warmup_delay);
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }
        Ok(())
    }

    fn fetch_summary(&mut self, date: NaiveDate, category: u8, market: MarketType) -> Vec<SummaryRow> {
        let query = summary_query(date, category, market);
        match self.get_rows(SUMMARY_PATH, &query, self.settings.summary_timeout) {
            Ok(rows) => decode_rows(rows),
            Err(e) => {
                warn!(%date, category, %market, error = %e, "summary fetch failed");
                Vec::new()
            }
        }
    }

    fn fetch_grid(&mut self, window: DateWindow, region_id: u32, market: MarketType) -> Vec<GridRow> {
        let query = grid_query(window, region_id, market);
        match self.get_rows(GRID_PATH, &query, self.settings.grid_timeout) {
            Ok(rows) => decode_rows(rows),
            Err(e) => {
                warn!(%window, region_id, %market, error = %e, "grid fetch failed");
                Vec::new()
            }
        }
    }
}

/// Query parameters for the point-summary endpoint.
///
/// The portal expects dates like `Feb 28, 2026`.
pub fn summary_query(date: NaiveDate, category: u8, market: MarketType) -> Vec<(&'static str, String)> {
    vec![
        ("tanggal", date.format("%b %d, %Y").to_string()),
        ("commodity", category.to_string()),
        ("priceType", market.source_code().to_string()),
        ("provId", ALL_REGIONS.to_string()),
    ]
}

/// Query parameters for the ranged-grid endpoint.
pub fn grid_query(window: DateWindow, region_id: u32, market: MarketType) -> Vec<(&'static str, String)> {
    vec![
        ("price_type_id", market.source_code().to_string()),
        ("start_date", window.start.format("%Y-%m-%d").to_string()),
        ("end_date", window.end.format("%Y-%m-%d").to_string()),
        ("province_id", region_id.to_string()),
        ("regency_id", String::new()),
        ("market_id", String::new()),
        ("commodity_id", String::new()),
        ("tipe_laporan", DAILY_REPORT.to_string()),
    ]
}

/// Extract the `data` array from a response body. A missing or null `data`
/// is an empty table, not an error.
fn parse_envelope(body: &str) -> Result<Vec<Value>, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(envelope.data.unwrap_or_default())
}

/// Decode rows one by one so a single malformed row does not cost the payload.
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(error = %e, "dropping undecodable row");
                None
            }
        })
        .collect()
}
