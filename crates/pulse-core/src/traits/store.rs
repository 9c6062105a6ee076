//! Feedback storage contract.

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::types::FeedbackRecord;

/// Source of scoped storage sessions.
pub trait FeedbackStore: Send + Sync {
    /// Open a session for one pipeline run. The session is released when dropped.
    fn open_session(&self) -> Result<Box<dyn FeedbackSession>>;
}

/// A scoped storage session.
pub trait FeedbackSession: Send {
    /// All records with `created_at >= cutoff`, where `cutoff` is naive UTC+8.
    /// Ordering is not guaranteed.
    fn fetch_since(&self, cutoff: NaiveDateTime) -> Result<Vec<FeedbackRecord>>;
}
