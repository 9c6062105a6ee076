use async_trait::async_trait;

use crate::types::FeedbackRecord;

/// Turns a batch of feedback into digest text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `None` means the summary could not be produced; the cause is logged by the implementor.
    async fn summarize(&self, records: &[FeedbackRecord]) -> Option<String>;
}
