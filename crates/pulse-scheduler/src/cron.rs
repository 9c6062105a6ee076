//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds)
//! Wildcards: *, */N, N, comma lists
//! Example: "0 19 * * 0" = every Sunday at 19:00
//!
//! Expressions are evaluated in a fixed offset, not in the host zone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};

/// How far ahead to search before giving up (covers leap-day expressions).
const SEARCH_HORIZON_DAYS: i64 = 366 * 4;

/// A parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    /// 0 = Sunday.
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSpec {
    pub fn parse(expression: &str) -> Option<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            tracing::warn!(
                "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
                expression
            );
            return None;
        }

        let mut days_of_week = parse_field(parts[4], 0, 7)?;
        // 7 is an alias for Sunday.
        for d in days_of_week.iter_mut() {
            if *d == 7 {
                *d = 0;
            }
        }
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Some(Self {
            minutes: parse_field(parts[0], 0, 59)?,
            hours: parse_field(parts[1], 0, 23)?,
            days_of_month: parse_field(parts[2], 1, 31)?,
            months: parse_field(parts[3], 1, 12)?,
            days_of_week,
            dom_restricted: parts[2] != "*",
            dow_restricted: parts[4] != "*",
        })
    }

    /// Next matching minute strictly after `after`, evaluated in `tz`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: &FixedOffset) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(tz).naive_local();
        let mut candidate = (local + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;
        let limit = candidate + Duration::days(SEARCH_HORIZON_DAYS);

        while candidate <= limit {
            if !self.months.contains(&candidate.month()) || !self.day_matches(&candidate) {
                candidate = candidate.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(&candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(&candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }
            return tz
                .from_local_datetime(&candidate)
                .single()
                .map(|t| t.with_timezone(&Utc));
        }

        None
    }

    // Standard cron rule: when both day fields are restricted, either may match.
    fn day_matches(&self, at: &NaiveDateTime) -> bool {
        let dom = self.days_of_month.contains(&at.day());
        let dow = self
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday());
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

/// Parse a cron expression and compute the next run time in `tz`.
pub fn next_run_from_cron(
    expression: &str,
    after: DateTime<Utc>,
    tz: &FixedOffset,
) -> Option<DateTime<Utc>> {
    CronSpec::parse(expression)?.next_after(after, tz)
}

/// Parse a cron field into a list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    // */N: every N
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    // Comma-separated: "0,15,30,45"
    let mut vals = Vec::new();
    for part in field.split(',') {
        let n: u32 = part.trim().parse().ok()?;
        if n < min || n > max {
            return None;
        }
        vals.push(n);
    }
    vals.sort_unstable();
    vals.dedup();
    Some(vals)
}
