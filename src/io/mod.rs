//! Turning raw portal payloads into price records.
//!
//! - lenient cell parsing (`parse`)
//! - row → `PriceRecord` mapping (`normalize`)

pub mod normalize;
pub mod parse;

pub use normalize::RowNormalizer;
