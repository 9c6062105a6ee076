//! Fixed-zone clock.
//!
//! All scheduling and cutoff math runs in UTC+8, whatever the host zone is.
//! Stored feedback timestamps are naive UTC+8 values, so every cutoff must go
//! through [`to_local_naive`] before it is compared against storage.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc, Weekday};

/// Offset of the digest zone from UTC, in seconds.
pub const UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Display name of the digest zone.
pub const ZONE_NAME: &str = "UTC+8";

/// The fixed digest zone.
pub fn zone() -> FixedOffset {
    FixedOffset::east_opt(UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current time in the digest zone.
pub fn now_local() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&zone())
}

/// Convert an absolute instant into the naive UTC+8 form used by storage.
pub fn to_local_naive(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&zone()).naive_local()
}

/// Re-attach the digest zone to a naive UTC+8 value read from storage.
pub fn from_local_naive(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(UTC_OFFSET_SECS));
    zone().from_utc_datetime(&utc)
}

/// Chinese weekday label, e.g. "星期日".
pub fn weekday_name(at: &DateTime<FixedOffset>) -> &'static str {
    match at.weekday() {
        Weekday::Mon => "星期一",
        Weekday::Tue => "星期二",
        Weekday::Wed => "星期三",
        Weekday::Thu => "星期四",
        Weekday::Fri => "星期五",
        Weekday::Sat => "星期六",
        Weekday::Sun => "星期日",
    }
}

/// `YYYY-MM-DD HH:MM:SS` in the digest zone.
pub fn format_local(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
