//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that:
//! - parses CLI arguments and sets up logging
//! - loads store credentials before any network activity
//! - runs the requested ingestion mode
//! - prints the outcome and maps it to an exit code

use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{BackfillArgs, Cli, Command, DailyArgs};
use crate::config::{ClientSettings, RunSettings, StoreConfig};
use crate::data::codes::CodeTables;
use crate::data::pihps::PihpsClient;
use crate::domain::MarketType;
use crate::error::AppError;
use crate::store::SupabaseStore;

pub mod pipeline;

use pipeline::RunMode;

/// Entry point for the `pangan` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Daily(args) => handle_daily(args),
        Command::Backfill(args) => handle_backfill(args),
        Command::Refresh => handle_refresh(),
    }
}

/// `info` by default; `RUST_LOG` overrides. Logs go to stderr, the summary to stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn handle_daily(args: DailyArgs) -> Result<(), AppError> {
    let tables = CodeTables::standard();
    let settings = run_settings(&tables, &args.markets, &[])?;
    handle_run(&tables, &settings, RunMode::Daily, args.refresh)
}

fn handle_backfill(args: BackfillArgs) -> Result<(), AppError> {
    let tables = CodeTables::standard();
    let settings = run_settings(&tables, &args.markets, &args.regions)?;
    handle_run(&tables, &settings, RunMode::Backfill { days: args.days }, args.refresh)
}

fn handle_run(tables: &CodeTables, settings: &RunSettings, mode: RunMode, refresh: bool) -> Result<(), AppError> {
    let store_config = StoreConfig::from_env()?;
    let client_settings = ClientSettings::from_env()?;
    let mut store = SupabaseStore::new(&store_config)?;
    let mut client = PihpsClient::new(client_settings)?;

    let today = Local::now().date_naive();
    let outcome = pipeline::run_mode(&mut client, &mut store, tables, settings, mode, today);
    println!("{}", crate::report::format_outcome(mode.title(), &outcome));

    if refresh {
        pipeline::refresh_after(&mut store, &outcome)?;
    }
    pipeline::check_outcome(&outcome)
}

fn handle_refresh() -> Result<(), AppError> {
    let store_config = StoreConfig::from_env()?;
    let mut store = SupabaseStore::new(&store_config)?;
    pipeline::refresh(&mut store)?;
    println!("National averages refreshed.");
    Ok(())
}

/// Build run settings from CLI filters. Empty filters mean "all".
pub fn run_settings(
    tables: &CodeTables,
    markets: &[MarketType],
    regions: &[String],
) -> Result<RunSettings, AppError> {
    let mut settings = RunSettings::default();
    if !markets.is_empty() {
        let mut wanted = markets.to_vec();
        wanted.sort();
        wanted.dedup();
        settings.markets = wanted;
    }
    if !regions.is_empty() {
        let ids = regions
            .iter()
            .map(|query| {
                tables.find_region(query).map(|r| r.source_id).ok_or_else(|| {
                    AppError::config(format!(
                        "Unknown region '{query}' (use a two-digit region code or a region name)."
                    ))
                })
            })
            .collect::<Result<Vec<u32>, AppError>>()?;
        settings.regions = Some(ids);
    }
    Ok(settings)
}
