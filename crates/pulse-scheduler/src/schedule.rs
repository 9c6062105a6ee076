//! Schedule builder: turns [`ScheduleConfig`] into the job set.

use pulse_core::config::ScheduleConfig;

use crate::jobs::{STARTUP_JOB_ID, SummaryJob};

/// Build every job the configuration asks for.
///
/// A non-zero interval wins over daily hours. Invalid hours are skipped one
/// by one. The weekly job is added whenever `enable_weekly` is set.
pub fn build_schedule(config: &ScheduleConfig) -> Vec<SummaryJob> {
    let mut jobs = Vec::new();

    if config.interval_hours > 0 {
        tracing::info!(
            "📅 Scheduling feedback summary every {} hours (UTC+8)",
            config.interval_hours
        );
        jobs.push(SummaryJob::interval(config.interval_hours));
    } else {
        for hour in config.daily_hours.iter() {
            if hour > 23 {
                tracing::warn!("⚠️ Invalid hour ({hour}) in SUMMARY_SCHEDULE_HOURS. Skipping.");
                continue;
            }
            tracing::info!("📅 Scheduling feedback summary daily at {hour:02}:00 (UTC+8)");
            jobs.push(SummaryJob::daily(hour));
        }
    }

    if jobs.is_empty() {
        tracing::info!(
            "No daily/interval schedule configured for feedback summary. \
             Set SUMMARY_INTERVAL_HOURS or SUMMARY_SCHEDULE_HOURS."
        );
    }

    if config.enable_weekly {
        tracing::info!("📅 Scheduling weekly feedback summary on Sunday at 19:00 (UTC+8)");
        jobs.push(SummaryJob::weekly());
    }

    jobs
}

/// The one-off digest fired at startup: same window as the regular daily digest.
pub fn startup_job(config: &ScheduleConfig) -> SummaryJob {
    let base = if config.interval_hours > 0 {
        SummaryJob::interval(config.interval_hours)
    } else {
        SummaryJob::daily(0)
    };
    SummaryJob {
        id: STARTUP_JOB_ID.to_string(),
        ..base
    }
}
