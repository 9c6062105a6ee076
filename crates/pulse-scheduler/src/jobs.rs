//! Job definitions: the core data model for scheduled digests.

use chrono::{DateTime, Duration, FixedOffset, Utc, Weekday};

use crate::cron;

pub const INTERVAL_JOB_ID: &str = "feedback_summary_interval";
pub const WEEKLY_JOB_ID: &str = "feedback_summary_weekly";
pub const STARTUP_JOB_ID: &str = "feedback_summary_startup";

/// Label of every interval/daily digest.
pub const DAILY_LABEL: &str = "日报";
/// Label of the weekly digest.
pub const WEEKLY_LABEL: &str = "周报";

pub const WEEKLY_WEEKDAY: Weekday = Weekday::Sun;
pub const WEEKLY_HOUR: u32 = 19;

/// Id of the daily job firing at `hour`, e.g. `feedback_summary_daily_09`.
pub fn daily_job_id(hour: u32) -> String {
    format!("feedback_summary_daily_{hour:02}")
}

/// Start of a `lookback` window ending at `now`, or `None` if it falls
/// outside the representable calendar.
pub fn window_start(now: DateTime<Utc>, lookback: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(lookback)
}

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Every N hours, first firing N hours after registration.
    Interval { hours: u32 },
    /// Every day at `hour`:00 in the digest zone.
    Daily { hour: u32 },
    /// Every week on `weekday` at `hour`:00 in the digest zone.
    Weekly { weekday: Weekday, hour: u32 },
}

impl Trigger {
    /// Cron form of the fixed-time triggers.
    pub fn cron_expression(&self) -> Option<String> {
        match self {
            Trigger::Interval { .. } => None,
            Trigger::Daily { hour } => Some(format!("0 {hour} * * *")),
            Trigger::Weekly { weekday, hour } => {
                Some(format!("0 {hour} * * {}", weekday.num_days_from_sunday()))
            }
        }
    }

    /// First due time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: &FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval { hours } if *hours > 0 => {
                after.checked_add_signed(Duration::hours(i64::from(*hours)))
            }
            Trigger::Interval { .. } => None,
            _ => cron::next_run_from_cron(&self.cron_expression()?, after, tz),
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Interval { hours } => write!(f, "every {hours}h"),
            Trigger::Daily { hour } => write!(f, "daily at {hour:02}:00"),
            Trigger::Weekly { weekday, hour } => write!(f, "every {weekday} at {hour:02}:00"),
        }
    }
}

/// One scheduled digest responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryJob {
    /// Unique job id. Registering the same id again replaces the job.
    pub id: String,
    /// Digest label shown as the card title.
    pub label: String,
    pub trigger: Trigger,
    /// How far back each run looks.
    pub lookback: Duration,
}

impl SummaryJob {
    /// Interval job: fires every `hours`, looks back the same span.
    pub fn interval(hours: u32) -> Self {
        Self {
            id: INTERVAL_JOB_ID.to_string(),
            label: DAILY_LABEL.to_string(),
            trigger: Trigger::Interval { hours },
            lookback: Duration::hours(i64::from(hours)),
        }
    }

    /// Daily job at `hour`:00, looks back 24 hours.
    pub fn daily(hour: u32) -> Self {
        Self {
            id: daily_job_id(hour),
            label: DAILY_LABEL.to_string(),
            trigger: Trigger::Daily { hour },
            lookback: Duration::hours(24),
        }
    }

    /// Sunday 19:00 job, looks back 7 days.
    pub fn weekly() -> Self {
        Self {
            id: WEEKLY_JOB_ID.to_string(),
            label: WEEKLY_LABEL.to_string(),
            trigger: Trigger::Weekly {
                weekday: WEEKLY_WEEKDAY,
                hour: WEEKLY_HOUR,
            },
            lookback: Duration::days(7),
        }
    }

    /// Human-readable name, e.g. "Feedback Summary (daily at 09:00 UTC+8)".
    pub fn describe(&self) -> String {
        format!("Feedback Summary ({} {})", self.trigger, pulse_core::clock::ZONE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_job_ids_are_zero_padded() {
        assert_eq!(daily_job_id(9), "feedback_summary_daily_09");
        assert_eq!(SummaryJob::daily(18).id, "feedback_summary_daily_18");
    }

    #[test]
    fn test_lookbacks() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let start = |job: SummaryJob| window_start(now, job.lookback);
        assert_eq!(start(SummaryJob::interval(6)), Some(now - Duration::hours(6)));
        assert_eq!(start(SummaryJob::daily(9)), Some(now - Duration::hours(24)));
        assert_eq!(
            start(SummaryJob::weekly()),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_huge_interval_has_no_run_or_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let job = SummaryJob::interval(u32::MAX);
        assert_eq!(job.trigger.next_after(now, &tz), None);
        assert_eq!(window_start(now, job.lookback), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(SummaryJob::interval(3).label, "日报");
        assert_eq!(SummaryJob::daily(0).label, "日报");
        assert_eq!(SummaryJob::weekly().label, "周报");
    }

    #[test]
    fn test_cron_forms() {
        assert_eq!(Trigger::Daily { hour: 6 }.cron_expression().as_deref(), Some("0 6 * * *"));
        assert_eq!(SummaryJob::weekly().trigger.cron_expression().as_deref(), Some("0 19 * * 0"));
        assert_eq!(Trigger::Interval { hours: 2 }.cron_expression(), None);
    }

    #[test]
    fn test_interval_next_after() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        assert_eq!(
            Trigger::Interval { hours: 4 }.next_after(now, &tz),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(Trigger::Interval { hours: 0 }.next_after(now, &tz), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            SummaryJob::daily(9).describe(),
            "Feedback Summary (daily at 09:00 UTC+8)"
        );
        assert_eq!(
            SummaryJob::weekly().describe(),
            "Feedback Summary (every Sun at 19:00 UTC+8)"
        );
    }
}
