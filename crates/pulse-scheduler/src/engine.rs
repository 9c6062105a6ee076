//! Scheduler Engine: the loop that checks and fires digest jobs.
//! Uses tokio::interval for ticking (sleeps between checks).
//!
//! Each firing runs on its own task, so jobs with different ids may overlap.
//! A job id that is still in flight when it comes due again is skipped for
//! that slot instead of stacking up.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::jobs::SummaryJob;

/// Body bound to every firing.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one firing. Outcomes are only observable through logs.
    async fn run(&self, job: &SummaryJob);
}

/// A registered job with its timing state.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub job: SummaryJob,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u32,
}

/// Job table plus in-flight bookkeeping. Owns no tasks.
pub struct SchedulerEngine {
    jobs: Vec<JobEntry>,
    in_flight: HashSet<String>,
    tz: FixedOffset,
}

impl SchedulerEngine {
    pub fn new(tz: FixedOffset) -> Self {
        Self {
            jobs: Vec::new(),
            in_flight: HashSet::new(),
            tz,
        }
    }

    /// Register a job. An existing job with the same id is replaced.
    /// Returns true when a replacement happened.
    pub fn add_job(&mut self, job: SummaryJob, now: DateTime<Utc>) -> bool {
        let next_run = job.trigger.next_after(now, &self.tz);
        if next_run.is_none() {
            tracing::warn!("⚠️ Job '{}' has no upcoming run ({})", job.id, job.trigger);
        }
        let entry = JobEntry {
            job,
            next_run,
            last_run: None,
            run_count: 0,
        };

        if let Some(existing) = self.jobs.iter_mut().find(|s| s.job.id == entry.job.id) {
            tracing::info!("📅 Job replaced: '{}' ({})", entry.job.describe(), entry.job.id);
            *existing = entry;
            true
        } else {
            tracing::info!("📅 Job added: '{}' ({})", entry.job.describe(), entry.job.id);
            self.jobs.push(entry);
            false
        }
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn entries(&self) -> Vec<JobEntry> {
        self.jobs.clone()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Collect jobs due at `now`, mark them in flight and advance their next run.
    pub fn due_jobs(&mut self, now: DateTime<Utc>) -> Vec<SummaryJob> {
        let mut due = Vec::new();

        for scheduled in self.jobs.iter_mut() {
            let Some(next) = scheduled.next_run else {
                continue;
            };
            if next > now {
                continue;
            }

            // Advance past `now` on the trigger's own grid.
            let mut upcoming = scheduled.job.trigger.next_after(next, &self.tz);
            while let Some(t) = upcoming {
                if t > now {
                    break;
                }
                upcoming = scheduled.job.trigger.next_after(t, &self.tz);
            }
            scheduled.next_run = upcoming;

            if self.in_flight.contains(&scheduled.job.id) {
                tracing::warn!(
                    "⏭️ Job '{}' is still running; skipping this run",
                    scheduled.job.id
                );
                continue;
            }

            tracing::info!("🔔 Job triggered: '{}'", scheduled.job.describe());
            scheduled.last_run = Some(now);
            scheduled.run_count += 1;
            self.in_flight.insert(scheduled.job.id.clone());
            due.push(scheduled.job.clone());
        }

        due
    }

    /// Mark a firing as finished.
    pub fn finish(&mut self, id: &str) {
        self.in_flight.remove(id);
    }

    #[cfg(test)]
    fn set_next_run(&mut self, id: &str, at: DateTime<Utc>) {
        if let Some(s) = self.jobs.iter_mut().find(|s| s.job.id == id) {
            s.next_run = Some(at);
        }
    }
}

/// Owned scheduler: job table, handler and the background tick loop.
pub struct Scheduler {
    engine: Arc<Mutex<SchedulerEngine>>,
    handler: Arc<dyn JobHandler>,
    tick: Duration,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(handler: Arc<dyn JobHandler>, tz: FixedOffset, tick: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(SchedulerEngine::new(tz))),
            handler,
            tick,
            loop_handle: Mutex::new(None),
        }
    }

    /// Register (or replace) a job.
    pub async fn add_job(&self, job: SummaryJob) -> bool {
        self.engine.lock().await.add_job(job, Utc::now())
    }

    pub async fn job_count(&self) -> usize {
        self.engine.lock().await.job_count()
    }

    pub async fn entries(&self) -> Vec<JobEntry> {
        self.engine.lock().await.entries()
    }

    pub async fn is_running(&self) -> bool {
        self.loop_handle.lock().await.is_some()
    }

    /// Start firing. No-op (returns false) when already running or when no job is registered.
    pub async fn start(&self) -> bool {
        let mut handle = self.loop_handle.lock().await;
        if handle.is_some() {
            tracing::info!("Scheduler is already running.");
            return false;
        }
        let count = self.engine.lock().await.job_count();
        if count == 0 {
            tracing::info!("No jobs scheduled, scheduler not started.");
            return false;
        }

        tracing::info!(
            "⏰ Scheduler started with {} jobs (check every {}s)",
            count,
            self.tick.as_secs()
        );
        *handle = Some(tokio::spawn(run_loop(
            self.engine.clone(),
            self.handler.clone(),
            self.tick,
        )));
        true
    }

    /// Stop firing. In-flight runs are left to finish. Returns false if not running.
    pub async fn stop(&self) -> bool {
        match self.loop_handle.lock().await.take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("⏹️ Scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Drop every registered job.
    pub async fn clear(&self) {
        self.engine.lock().await.clear();
    }

    /// Fire `job` once on a detached task. Nobody awaits the outcome.
    pub fn spawn_detached(&self, job: SummaryJob) {
        let handler = self.handler.clone();
        tracing::info!("🚀 Running '{}' once in the background", job.id);
        tokio::spawn(run_guarded(handler, job));
    }
}

async fn run_loop(engine: Arc<Mutex<SchedulerEngine>>, handler: Arc<dyn JobHandler>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);

    loop {
        interval.tick().await;

        let due = engine.lock().await.due_jobs(Utc::now());
        for job in due {
            spawn_firing(engine.clone(), handler.clone(), job);
        }
    }
}

/// Run `job` on a nested task and log a panic instead of propagating it.
/// Returns false when the run did not complete.
async fn run_guarded(handler: Arc<dyn JobHandler>, job: SummaryJob) -> bool {
    let id = job.id.clone();
    let run = tokio::spawn(async move {
        handler.run(&job).await;
    });
    match run.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("💥 Job '{}' aborted: {}", id, e);
            false
        }
    }
}

/// Run one firing on its own task; a panic stays inside that task.
fn spawn_firing(engine: Arc<Mutex<SchedulerEngine>>, handler: Arc<dyn JobHandler>, job: SummaryJob) {
    tokio::spawn(async move {
        let id = job.id.clone();
        run_guarded(handler, job).await;
        engine.lock().await.finish(&id);
    });
}
