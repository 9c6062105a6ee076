//! # Pulse Scheduler
//!
//! Periodic feedback digests.
//!
//! ## Architecture
//! ```text
//! Scheduler (tokio interval)
//!   ├── feedback_summary_interval   every N hours   → 日报
//!   ├── feedback_summary_daily_HH   HH:00 UTC+8     → 日报
//!   ├── feedback_summary_weekly     Sun 19:00 UTC+8 → 周报
//!   └── on fire → SummaryPipeline
//!                   ├── FeedbackStore   (records since cutoff)
//!                   ├── Summarizer      (language model)
//!                   └── Notifier        (webhook card)
//! ```

pub mod cron;
pub mod dispatch;
pub mod engine;
pub mod jobs;
pub mod pipeline;
pub mod schedule;

use pulse_core::config::ScheduleConfig;

pub use dispatch::WebhookNotifier;
pub use engine::{JobEntry, JobHandler, Scheduler, SchedulerEngine};
pub use jobs::{SummaryJob, Trigger};
pub use pipeline::SummaryPipeline;
pub use schedule::{build_schedule, startup_job};

/// Startup hook: register every configured job and start firing.
///
/// When `run_on_startup` is set, one daily digest is also spawned in the
/// background; its outcome is never awaited. Returns whether the scheduler
/// is now running.
pub async fn initialize_scheduler(scheduler: &Scheduler, config: &ScheduleConfig) -> bool {
    for job in build_schedule(config) {
        scheduler.add_job(job).await;
    }

    let started = scheduler.start().await;

    if config.run_on_startup {
        tracing::info!("RUN_SUMMARY_ON_STARTUP is set; running feedback summary now");
        scheduler.spawn_detached(startup_job(config));
    }

    started
}

/// Shutdown hook: stop firing and drop all jobs. Safe if never started.
pub async fn shutdown_scheduler(scheduler: &Scheduler) {
    if scheduler.stop().await {
        tracing::info!("Application shutdown: scheduler shut down");
    }
    scheduler.clear().await;
}
