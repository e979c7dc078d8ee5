//! Run configuration.
//!
//! Store credentials come from the environment (a `.env` file is honoured) and
//! are mandatory. Portal settings have compiled-in defaults with optional
//! environment overrides.

use std::time::Duration;

use crate::domain::MarketType;
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://www.bi.go.id/hargapangan";
pub const DEFAULT_SOURCE: &str = "bi";
pub const UPSERT_BATCH_SIZE: usize = 500;
/// Fewer distinct regions than this marks a run `partial` (daily mode expects 34).
pub const MIN_REGIONS_FOR_SUCCESS: usize = 20;
pub const BACKFILL_CHUNK_DAYS: u32 = 7;
pub const DEFAULT_BACKFILL_DAYS: u32 = 90;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Connection details for the price store.
#[derive(Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::config(format!("Missing {name} in environment (.env).")))
        };
        let url = required("SUPABASE_URL")?;
        let key = required("SUPABASE_KEY")?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key,
        })
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// HTTP behaviour towards the price portal.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub warmup_timeout: Duration,
    pub summary_timeout: Duration,
    pub grid_timeout: Duration,
    /// Pause after the landing-page visit.
    pub warmup_delay: Duration,
    /// Pause after every table request, successful or not.
    pub request_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            warmup_timeout: Duration::from_secs(60),
            summary_timeout: Duration::from_secs(30),
            grid_timeout: Duration::from_secs(60),
            warmup_delay: Duration::from_secs(2),
            request_delay: Duration::from_millis(1500),
        }
    }
}

impl ClientSettings {
    /// Defaults, overridden by `PIHPS_BASE_URL` / `PIHPS_REQUEST_DELAY_MS` when set.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();
        if let Some(url) = lookup("PIHPS_BASE_URL").filter(|v| !v.trim().is_empty()) {
            settings.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("PIHPS_REQUEST_DELAY_MS").filter(|v| !v.trim().is_empty()) {
            let ms = raw.trim().parse::<u64>().map_err(|_| {
                AppError::config(format!("Invalid PIHPS_REQUEST_DELAY_MS '{raw}' (expected milliseconds)."))
            })?;
            settings.request_delay = Duration::from_millis(ms);
        }
        Ok(settings)
    }

    /// Zero delays and short timeouts, for tests against local endpoints.
    pub fn without_delays(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            warmup_timeout: Duration::from_secs(2),
            summary_timeout: Duration::from_secs(2),
            grid_timeout: Duration::from_secs(2),
            warmup_delay: Duration::ZERO,
            request_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Knobs of a single ingestion run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Tag written to every record's `source` column.
    pub source: String,
    pub markets: Vec<MarketType>,
    /// Portal region ids to enumerate in backfill mode (`None` = all).
    pub regions: Option<Vec<u32>>,
    pub batch_size: usize,
    pub min_regions: usize,
    pub chunk_days: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            markets: MarketType::ALL.to_vec(),
            regions: None,
            batch_size: UPSERT_BATCH_SIZE,
            min_regions: MIN_REGIONS_FOR_SUCCESS,
            chunk_days: BACKFILL_CHUNK_DAYS,
        }
    }
}
