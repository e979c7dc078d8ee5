//! Terminal output for a finished run.
//!
//! Formatting lives here so the ingestion code only deals in `ScrapeOutcome`s.

use crate::domain::{ScrapeOutcome, ScrapeStatus};

/// Short outcome summary printed after every run.
pub fn format_outcome(title: &str, outcome: &ScrapeOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== pangan - {title} ===\n"));
    out.push_str(&format!("Date:        {}\n", outcome.scrape_date));
    out.push_str(&format!("Source:      {}\n", outcome.source));
    out.push_str(&format!("Status:      {}\n", outcome.status));
    out.push_str(&format!("Commodities: {}\n", outcome.commodities_scraped));
    out.push_str(&format!("Regions:     {}\n", outcome.provinces_scraped));
    out.push_str(&format!("Rows:        {}\n", outcome.rows_inserted));
    out.push_str(&format!("Duration:    {:.2}s\n", outcome.duration_seconds));

    if let Some(err) = &outcome.error_message {
        out.push_str(&format!("Error:       {err}\n"));
    }
    if outcome.status == ScrapeStatus::Partial {
        out.push_str("\nNote: partial run; rerun the same mode to fill the gaps.\n");
    }

    out
}
