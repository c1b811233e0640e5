// Time helpers shared by the bucket and the identifier generator.
//
// Stored timestamps are kept at millisecond precision so that a value
// written to a collection compares equal to the value it was built from.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Drop sub-millisecond precision
pub fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    date.duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(date)
}

// Current time, millisecond precision
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}
