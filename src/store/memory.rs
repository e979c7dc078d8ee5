//! In-process store with the same upsert-on-natural-key semantics as the
//! production store. Individual batches can be told to fail.

use std::collections::{BTreeMap, HashSet};

use super::{PriceStore, StoreError};
use crate::domain::{CommodityIds, NaturalKey, PriceRecord, ScrapeOutcome};

#[derive(Debug, Default)]
pub struct MemoryStore {
    commodities: Vec<(String, i64)>,
    prices: BTreeMap<NaturalKey, PriceRecord>,
    outcomes: Vec<ScrapeOutcome>,
    failing_batches: HashSet<usize>,
    fail_reference: bool,
    upsert_calls: usize,
    refreshes: usize,
}

impl MemoryStore {
    pub fn with_commodities<S: Into<String>>(commodities: impl IntoIterator<Item = (S, i64)>) -> Self {
        Self {
            commodities: commodities.into_iter().map(|(s, id)| (s.into(), id)).collect(),
            ..Self::default()
        }
    }

    /// Make the `call`-th upsert (0-based, counted over the store's lifetime) fail.
    pub fn fail_batch(&mut self, call: usize) {
        self.failing_batches.insert(call);
    }

    pub fn fail_reference_load(&mut self) {
        self.fail_reference = true;
    }

    pub fn get(&self, key: &NaturalKey) -> Option<&PriceRecord> {
        self.prices.get(key)
    }

    /// Stored rows in natural-key order.
    pub fn prices(&self) -> Vec<&PriceRecord> {
        self.prices.values().collect()
    }

    pub fn price_count(&self) -> usize {
        self.prices.len()
    }

    pub fn outcomes(&self) -> &[ScrapeOutcome] {
        &self.outcomes
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl PriceStore for MemoryStore {
    fn load_commodity_ids(&self) -> Result<CommodityIds, StoreError> {
        if self.fail_reference {
            return Err(StoreError::Rejected("commodities table unavailable".to_string()));
        }
        Ok(self.commodities.iter().map(|(s, id)| (s.as_str(), *id)).collect())
    }

    fn upsert_prices(&mut self, batch: &[PriceRecord]) -> Result<usize, StoreError> {
        let call = self.upsert_calls;
        self.upsert_calls += 1;
        if self.failing_batches.contains(&call) {
            return Err(StoreError::Rejected(format!("batch {call} refused")));
        }
        for record in batch {
            self.prices.insert(record.natural_key(), record.clone());
        }
        Ok(batch.len())
    }

    fn append_outcome(&mut self, outcome: &ScrapeOutcome) -> Result<(), StoreError> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }

    fn refresh_aggregates(&mut self) -> Result<(), StoreError> {
        self.refreshes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketType;
    use chrono::NaiveDate;

    fn rec(commodity_id: i64, region: &str, price: f64) -> PriceRecord {
        PriceRecord {
            commodity_id,
            region_code: region.to_string(),
            price,
            market_type: MarketType::Traditional,
            date: NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
            source: "bi".to_string(),
        }
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut store = MemoryStore::default();
        store.upsert_prices(&[rec(1, "31", 100.0), rec(2, "31", 200.0)]).unwrap();
        store.upsert_prices(&[rec(1, "31", 150.0)]).unwrap();
        assert_eq!(store.price_count(), 2);
        assert_eq!(store.get(&rec(1, "31", 0.0).natural_key()).map(|r| r.price), Some(150.0));
    }

    #[test]
    fn failing_batch_writes_nothing() {
        let mut store = MemoryStore::default();
        store.fail_batch(0);
        assert!(store.upsert_prices(&[rec(1, "31", 100.0)]).is_err());
        assert_eq!(store.price_count(), 0);
        assert_eq!(store.upsert_prices(&[rec(1, "31", 100.0)]).unwrap(), 1);
    }

    #[test]
    fn reference_load() {
        let mut store = MemoryStore::with_commodities([("telur-ayam-ras-segar", 10)]);
        assert_eq!(store.load_commodity_ids().unwrap().get("telur-ayam-ras-segar"), Some(10));
        store.fail_reference_load();
        assert!(store.load_commodity_ids().is_err());
    }
}
