//! Date-window planning for the ranged endpoint.
//!
//! The portal's ranged table slows down and starts failing as the requested
//! range widens, so a backfill span is cut into short fixed-size windows.
//! Windows are ordered, contiguous, and never overlap.

use chrono::{Days, NaiveDate};

use crate::domain::DateWindow;
use crate::error::AppError;

/// Inclusive span covered by a backfill of `days` days ending on `today`.
pub fn backfill_span(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// Partition `[start, end]` into windows of at most `chunk_days` days.
///
/// Each window ends `chunk_days - 1` days after its start, clamped to `end`;
/// the next window starts the day after. An empty span yields no windows.
pub fn plan_windows(
    start: NaiveDate,
    end: NaiveDate,
    chunk_days: u32,
) -> Result<Vec<DateWindow>, AppError> {
    if chunk_days == 0 {
        return Err(AppError::config("Window size must be at least one day."));
    }

    let step = Days::new(u64::from(chunk_days - 1));
    let mut out = Vec::new();
    let mut current = start;
    while current <= end {
        let window_end = current.checked_add_days(step).map_or(end, |d| d.min(end));
        out.push(DateWindow {
            start: current,
            end: window_end,
        });
        match window_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(out)
}
