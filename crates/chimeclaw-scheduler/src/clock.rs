//! Event time resolution — raw date/time strings into timezone-aware
//! instants.

use chimeclaw_core::error::{ChimeClawError, Result};
use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Resolve a sheet row's date and time into an instant in `tz`.
///
/// Ambiguous local times (DST fall-back) take the earlier offset.
/// Nonexistent local times (DST spring-forward gap) are parse errors.
/// Never panics, whatever the input.
pub fn resolve(date: &str, time: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| ChimeClawError::Parse(format!("Bad date '{date}': {e}")))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|e| ChimeClawError::Parse(format!("Bad time '{time}': {e}")))?;

    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => Err(ChimeClawError::Parse(format!(
            "Nonexistent local time {date} {time} in {tz}"
        ))),
    }
}
