//! Command-line parsing for the food-price ingester.
//!
//! Argument parsing stays here; `app` turns parsed arguments into run settings.

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_BACKFILL_DAYS;
use crate::domain::MarketType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pangan", version, about = "Daily food-price ingester (BI PIHPS portal)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest the latest published day (yesterday, falling back to today).
    Daily(DailyArgs),
    /// Re-ingest a range of past days region by region.
    Backfill(BackfillArgs),
    /// Recompute the store's national averages.
    Refresh,
}

#[derive(Debug, Parser, Clone)]
pub struct DailyArgs {
    /// Market type to scrape (repeatable; default: both).
    #[arg(short = 'm', long = "market", value_enum)]
    pub markets: Vec<MarketType>,

    /// Refresh national averages after a successful or partial run.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct BackfillArgs {
    /// Number of days to go back from today.
    #[arg(short = 'd', long, default_value_t = DEFAULT_BACKFILL_DAYS)]
    pub days: u32,

    /// Market type to scrape (repeatable; default: both).
    #[arg(short = 'm', long = "market", value_enum)]
    pub markets: Vec<MarketType>,

    /// Region to scrape, as a two-digit code or a name (repeatable; default: all 34).
    #[arg(short = 'r', long = "region")]
    pub regions: Vec<String>,

    /// Refresh national averages after a successful or partial run.
    #[arg(long)]
    pub refresh: bool,
}
