//! Store backed by a hosted Postgres REST interface.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::info;

use super::{PriceStore, StoreError};
use crate::config::StoreConfig;
use crate::domain::{CommodityIds, NaturalKey, PriceRecord, ScrapeOutcome};
use crate::error::AppError;

const PRICES_TABLE: &str = "prices";
const COMMODITIES_TABLE: &str = "commodities";
const OUTCOMES_TABLE: &str = "scrape_logs";
const REFRESH_PROCEDURE: &str = "refresh_national_averages";

#[derive(Debug, Deserialize)]
struct CommodityRow {
    id: i64,
    slug: String,
}

pub struct SupabaseStore {
    client: Client,
    rest_url: String,
}

impl SupabaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self, AppError> {
        let key = HeaderValue::from_str(&config.key)
            .map_err(|_| AppError::config("SUPABASE_KEY contains invalid header characters."))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|_| AppError::config("SUPABASE_KEY contains invalid header characters."))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build store client: {e}")))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.url),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }
}

fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

impl PriceStore for SupabaseStore {
    fn load_commodity_ids(&self) -> Result<CommodityIds, StoreError> {
        let resp = self
            .client
            .get(self.table_url(COMMODITIES_TABLE))
            .query(&[("select", "id,slug")])
            .send()?;
        let rows: Vec<CommodityRow> = serde_json::from_str(&check(resp)?.text()?)?;
        let ids: CommodityIds = rows.into_iter().map(|r| (r.slug, r.id)).collect();
        info!(count = ids.len(), "loaded commodity ids");
        Ok(ids)
    }

    fn upsert_prices(&mut self, batch: &[PriceRecord]) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let resp = self
            .client
            .post(self.table_url(PRICES_TABLE))
            .query(&[("on_conflict", NaturalKey::COLUMNS)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .body(serde_json::to_vec(batch)?)
            .send()?;
        check(resp)?;
        Ok(batch.len())
    }

    fn append_outcome(&mut self, outcome: &ScrapeOutcome) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.table_url(OUTCOMES_TABLE))
            .header("Prefer", "return=minimal")
            .body(serde_json::to_vec(outcome)?)
            .send()?;
        check(resp)?;
        Ok(())
    }

    fn refresh_aggregates(&mut self) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.table_url(&format!("rpc/{REFRESH_PROCEDURE}")))
            .body("{}")
            .send()?;
        check(resp)?;
        Ok(())
    }
}
