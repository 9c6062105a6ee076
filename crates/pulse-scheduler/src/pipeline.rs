//! Summary pipeline: the body of every digest run.
//!
//! window → fetch → summarize → notify. Every failure ends the run with a log
//! line; nothing is returned to the scheduler.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pulse_core::clock;
use pulse_core::error::{PulseError, Result};
use pulse_core::traits::{FeedbackStore, Notifier, Summarizer};
use pulse_core::types::{DigestMessage, FeedbackRecord, SummaryResult};

use crate::engine::JobHandler;
use crate::jobs::{SummaryJob, window_start};

/// Wires storage, summarizer and notifier together.
pub struct SummaryPipeline {
    store: Arc<dyn FeedbackStore>,
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
}

impl SummaryPipeline {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            summarizer,
            notifier,
        }
    }

    /// Run one digest covering `[now - lookback, now]`.
    pub async fn execute(&self, label: &str, lookback: Duration) -> SummaryResult {
        self.execute_at(label, lookback, Utc::now()).await
    }

    /// Same as [`execute`](Self::execute) with an explicit clock.
    pub async fn execute_at(&self, label: &str, lookback: Duration, now: DateTime<Utc>) -> SummaryResult {
        let started = now.with_timezone(&clock::zone());
        tracing::info!("▶️ Starting {} job at {} {}", label, clock::format_local(&started), clock::ZONE_NAME);

        let result = match self.process(label, lookback, now).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("❌ Error in {} ({} failure): {:?}", label, e.class(), e);
                SummaryResult::failed(0)
            }
        };

        tracing::info!("🏁 Finished {} job (records: {}, success: {})", label, result.record_count, result.success);
        result
    }

    async fn process(&self, label: &str, lookback: Duration, now: DateTime<Utc>) -> Result<SummaryResult> {
        let cutoff_utc = window_start(now, lookback).ok_or_else(|| {
            PulseError::Config(format!("lookback of {}h reaches outside the calendar", lookback.num_hours()))
        })?;
        let cutoff_local = clock::to_local_naive(cutoff_utc);
        tracing::info!("[{}] Fetching feedback since {} {}", label, cutoff_local.format("%Y-%m-%d %H:%M:%S"), clock::ZONE_NAME);

        // Released on every return path below.
        let session = self.store.open_session()?;
        let records = session.fetch_since(cutoff_local)?;

        if records.is_empty() {
            tracing::info!("[{}] No new feedback to summarize since {}", label, cutoff_local.format("%Y-%m-%d %H:%M:%S"));
            return Ok(SummaryResult::empty());
        }

        let count = records.len();
        tracing::info!("[{}] Found {} feedback entries to summarize", label, count);

        let Some(summary) = self.summarizer.summarize(&records).await else {
            tracing::warn!("[{}] Failed to generate summary or summary was empty", label);
            return Ok(SummaryResult::failed(count));
        };
        tracing::debug!("[{}] Summary generated: {}", label, preview(&summary, 200));

        let message = DigestMessage {
            summary: summary.clone(),
            label: label.to_string(),
            total: count,
            categories: category_breakdown(&records),
        };
        let delivered = self.notifier.notify(&message).await;
        if !delivered {
            tracing::warn!("[{}] Digest could not be delivered", label);
        }

        Ok(SummaryResult {
            record_count: count,
            summary,
            success: delivered,
        })
    }
}

#[async_trait]
impl JobHandler for SummaryPipeline {
    async fn run(&self, job: &SummaryJob) {
        self.execute(&job.label, job.lookback).await;
    }
}

/// Per-category counts, most frequent first: `bug×3 · 建议×1`.
pub fn category_breakdown(records: &[FeedbackRecord]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        let kind = record.feedback_type.trim();
        let kind = if kind.is_empty() { "未分类" } else { kind };
        *counts.entry(kind).or_default() += 1;
    }
    if counts.is_empty() {
        return None;
    }

    let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
    // BTreeMap order is the tiebreak; the sort is stable.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    let parts: Vec<String> = ordered
        .iter()
        .map(|(kind, n)| format!("{kind}×{n}"))
        .collect();
    Some(parts.join(" · "))
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};
    use pulse_core::traits::FeedbackSession;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubStore {
        records: Vec<FeedbackRecord>,
        fail_fetch: bool,
        fail_open: bool,
        cutoffs: Arc<Mutex<Vec<NaiveDateTime>>>,
        opened: AtomicUsize,
        released: Arc<AtomicUsize>,
    }

    struct StubSession {
        records: Vec<FeedbackRecord>,
        fail: bool,
        cutoffs: Arc<Mutex<Vec<NaiveDateTime>>>,
        released: Arc<AtomicUsize>,
    }

    impl FeedbackStore for StubStore {
        fn open_session(&self) -> Result<Box<dyn FeedbackSession>> {
            if self.fail_open {
                return Err(PulseError::Storage("database is locked".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession {
                records: self.records.clone(),
                fail: self.fail_fetch,
                cutoffs: self.cutoffs.clone(),
                released: self.released.clone(),
            }))
        }
    }

    impl FeedbackSession for StubSession {
        fn fetch_since(&self, cutoff: NaiveDateTime) -> Result<Vec<FeedbackRecord>> {
            self.cutoffs.lock().unwrap().push(cutoff);
            if self.fail {
                return Err(PulseError::Storage("disk I/O error".into()));
            }
            Ok(self
                .records
                .iter()
                .filter(|r| r.created_at.naive_local() >= cutoff)
                .cloned()
                .collect())
        }
    }

    impl Drop for StubSession {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubSummarizer {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _records: &[FeedbackRecord]) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct StubNotifier {
        ok: bool,
        sent: Mutex<Vec<DigestMessage>>,
    }

    #[async_trait]
    impl Notifier for StubNotifier {
        async fn notify(&self, message: &DigestMessage) -> bool {
            self.sent.lock().unwrap().push(message.clone());
            self.ok
        }
    }

    struct Harness {
        store: Arc<StubStore>,
        summarizer: Arc<StubSummarizer>,
        notifier: Arc<StubNotifier>,
        pipeline: SummaryPipeline,
    }

    fn harness(store: StubStore, reply: Option<&str>, notify_ok: bool) -> Harness {
        let store = Arc::new(store);
        let summarizer = Arc::new(StubSummarizer {
            reply: reply.map(String::from),
            calls: AtomicUsize::new(0),
        });
        let notifier = Arc::new(StubNotifier {
            ok: notify_ok,
            sent: Mutex::new(Vec::new()),
        });
        let pipeline = SummaryPipeline::new(store.clone(), summarizer.clone(), notifier.clone());
        Harness {
            store,
            summarizer,
            notifier,
            pipeline,
        }
    }

    fn record(kind: &str, local: &str) -> FeedbackRecord {
        let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S").unwrap();
        FeedbackRecord {
            id: 1,
            user_uid: "u".into(),
            device_id: 1,
            app_version: "1.0".into(),
            app_channel: "web".into(),
            user_agent: "ua".into(),
            feedback_type: kind.into(),
            feedback: "text".into(),
            image_url: None,
            debug: None,
            created_at: clock::from_local_naive(naive),
        }
    }

    fn now() -> DateTime<Utc> {
        // 13:00 in UTC+8.
        Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_empty_window_skips_summarizer_and_notifier() {
        let h = harness(StubStore::default(), Some("unused"), true);
        let result = h.pipeline.execute_at("日报", Duration::hours(24), now()).await;

        assert_eq!(result, SummaryResult::empty());
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(h.store.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_summary_failure_never_notifies() {
        let store = StubStore {
            records: vec![record("bug", "2024-01-01 10:00:00")],
            ..StubStore::default()
        };
        let h = harness(store, None, true);
        let result = h.pipeline.execute_at("日报", Duration::hours(24), now()).await;

        assert!(!result.success);
        assert_eq!(result.record_count, 1);
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(h.store.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cutoff_is_converted_to_local_naive() {
        let h = harness(StubStore::default(), None, true);
        h.pipeline.execute_at("日报", Duration::hours(24), now()).await;

        // now - 24h = 2023-12-31T05:00Z = 2023-12-31 13:00 in UTC+8.
        let cutoffs = h.store.cutoffs.lock().unwrap();
        assert_eq!(cutoffs.len(), 1);
        assert_eq!(cutoffs[0].format("%Y-%m-%d %H:%M:%S").to_string(), "2023-12-31 13:00:00");
    }

    #[tokio::test]
    async fn test_successful_run_delivers_digest() {
        let store = StubStore {
            records: vec![
                record("bug", "2024-01-01 09:00:00"),
                record("建议", "2024-01-01 10:00:00"),
                record("bug", "2023-12-31 14:00:00"),
                // Outside the window: before 2023-12-31 13:00 local.
                record("bug", "2023-12-31 12:59:59"),
            ],
            ..StubStore::default()
        };
        let h = harness(store, Some("⚠️ 登录问题"), true);
        let result = h.pipeline.execute_at("日报", Duration::hours(24), now()).await;

        assert!(result.success);
        assert_eq!(result.record_count, 3);
        assert_eq!(result.summary, "⚠️ 登录问题");

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].label, "日报");
        assert_eq!(sent[0].total, 3);
        assert_eq!(sent[0].categories.as_deref(), Some("bug×2 · 建议×1"));
        assert_eq!(h.store.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webhook_failure_ends_cleanly() {
        let store = StubStore {
            records: vec![record("bug", "2024-01-01 09:00:00")],
            ..StubStore::default()
        };
        let h = harness(store, Some("summary"), false);
        let result = h.pipeline.execute_at("周报", Duration::days(7), now()).await;

        assert!(!result.success);
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
        assert_eq!(h.store.released.load(Ordering::SeqCst), 1);

        // The next run is unaffected.
        let again = h.pipeline.execute_at("周报", Duration::days(7), now()).await;
        assert_eq!(again.record_count, 1);
        assert_eq!(h.store.opened.load(Ordering::SeqCst), 2);
        assert_eq!(h.store.released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_storage_errors_are_contained() {
        let h = harness(
            StubStore {
                fail_fetch: true,
                ..StubStore::default()
            },
            Some("unused"),
            true,
        );
        let result = h.pipeline.execute_at("日报", Duration::hours(24), now()).await;
        assert_eq!(result, SummaryResult::failed(0));
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.released.load(Ordering::SeqCst), 1);

        let h = harness(
            StubStore {
                fail_open: true,
                ..StubStore::default()
            },
            Some("unused"),
            true,
        );
        let result = h.pipeline.execute_at("日报", Duration::hours(24), now()).await;
        assert!(!result.success);
        assert_eq!(h.store.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookback_past_calendar_fails_without_fetching() {
        let h = harness(StubStore::default(), Some("unused"), true);
        let result = h.pipeline.execute_at("日报", Duration::hours(i64::from(u32::MAX)), now()).await;

        assert_eq!(result, SummaryResult::failed(0));
        assert_eq!(h.store.opened.load(Ordering::SeqCst), 0);
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_job_handler_uses_job_window() {
        let h = harness(StubStore::default(), None, true);
        h.pipeline.run(&SummaryJob::weekly()).await;
        let cutoffs = h.store.cutoffs.lock().unwrap();
        assert_eq!(cutoffs.len(), 1);
        let expected = clock::to_local_naive(Utc::now() - Duration::days(7));
        let drift = (expected - cutoffs[0]).num_seconds().abs();
        assert!(drift < 60, "weekly cutoff off by {drift}s");
    }

    #[test]
    fn test_category_breakdown() {
        let records = vec![
            record("建议", "2024-01-01 09:00:00"),
            record("bug", "2024-01-01 09:00:00"),
            record(" ", "2024-01-01 09:00:00"),
            record("bug", "2024-01-01 09:00:00"),
            record("crash", "2024-01-01 09:00:00"),
        ];
        assert_eq!(
            category_breakdown(&records).as_deref(),
            Some("bug×2 · crash×1 · 建议×1 · 未分类×1")
        );
        assert_eq!(category_breakdown(&[]), None);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("反馈总结", 2), "反馈...");
        assert_eq!(preview("short", 10), "short");
    }
}
