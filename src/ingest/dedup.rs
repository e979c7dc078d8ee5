//! Natural-key deduplication.
//!
//! Daily runs may fetch both "yesterday" and "today", and adjacent backfill
//! windows may repeat a boundary date, so the same observation can appear more
//! than once before persistence. The last occurrence wins; output keeps the
//! position of each key's first occurrence.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::domain::{NaturalKey, PriceRecord};

pub fn dedup_records(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    let mut slots: HashMap<NaturalKey, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<PriceRecord> = Vec::with_capacity(records.len());

    for record in records {
        match slots.entry(record.natural_key()) {
            Entry::Occupied(slot) => out[*slot.get()] = record,
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(record);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketType;
    use chrono::NaiveDate;

    fn rec(commodity_id: i64, region: &str, d: u32, market: MarketType, price: f64) -> PriceRecord {
        PriceRecord {
            commodity_id,
            region_code: region.to_string(),
            price,
            market_type: market,
            date: NaiveDate::from_ymd_opt(2026, 2, d).unwrap(),
            source: "bi".to_string(),
        }
    }

    #[test]
    fn last_occurrence_wins() {
        let input = vec![
            rec(1, "31", 27, MarketType::Traditional, 100.0),
            rec(2, "31", 27, MarketType::Traditional, 200.0),
            rec(1, "31", 27, MarketType::Traditional, 110.0),
            rec(1, "31", 27, MarketType::Traditional, 120.0),
        ];
        let out = dedup_records(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].commodity_id, 1);
        assert_eq!(out[0].price, 120.0);
        assert_eq!(out[1].price, 200.0);
    }

    #[test]
    fn any_key_field_keeps_records_apart() {
        let mut other_source = rec(1, "31", 27, MarketType::Traditional, 5.0);
        other_source.source = "other".to_string();
        let input = vec![
            rec(1, "31", 27, MarketType::Traditional, 1.0),
            rec(1, "32", 27, MarketType::Traditional, 2.0),
            rec(1, "31", 26, MarketType::Traditional, 3.0),
            rec(1, "31", 27, MarketType::Modern, 4.0),
            other_source,
        ];
        assert_eq!(dedup_records(input).len(), 5);
    }

    #[test]
    fn survivor_is_the_greatest_index_per_key() {
        // Price encodes the input index so the survivor can be checked.
        let keys = [(1, "31"), (2, "31"), (1, "32"), (1, "31"), (2, "31"), (3, "11"), (1, "31")];
        let input: Vec<PriceRecord> = keys
            .iter()
            .enumerate()
            .map(|(i, (c, r))| rec(*c, r, 27, MarketType::Traditional, i as f64))
            .collect();

        let out = dedup_records(input.clone());
        for survivor in &out {
            let last = input
                .iter()
                .enumerate()
                .filter(|(_, r)| r.natural_key() == survivor.natural_key())
                .map(|(i, _)| i)
                .max()
                .unwrap();
            assert_eq!(survivor.price, last as f64);
        }
        let mut seen: Vec<NaturalKey> = out.iter().map(PriceRecord::natural_key).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), out.len());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn empty_input() {
        assert!(dedup_records(Vec::new()).is_empty());
    }
}
