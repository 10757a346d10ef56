/// Daily reset timing

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Browser clock (`Date.now()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
    }
}

/// Whether the counter should be zeroed.
///
/// A missing or unreadable `last_reset` counts as "never reset". A timestamp
/// ahead of `now` is not due.
pub fn reset_due(last_reset: Option<&str>, now: DateTime<Utc>, interval: TimeDelta) -> bool {
    match last_reset.and_then(parse_stamp) {
        Some(last) => now.signed_duration_since(last) >= interval,
        None => true,
    }
}

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_stamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| log::warn!("Unreadable lastReset {:?}: {}", text, e))
        .ok()
}

pub fn interval_hours(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX)
}
