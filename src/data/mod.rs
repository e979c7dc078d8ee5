//! Data sources: the portal client and the static code tables it needs.

pub mod codes;
pub mod pihps;

pub use codes::{CodeTables, Region};
pub use pihps::{FetchError, PihpsClient, TableSource};
