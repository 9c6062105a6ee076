//! Data types shared across the digest pipeline.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single piece of user feedback. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub user_uid: String,
    pub device_id: i64,
    pub app_version: String,
    pub app_channel: String,
    pub user_agent: String,
    /// Free-text category tag ("bug", "建议", ...).
    pub feedback_type: String,
    /// Feedback body.
    pub feedback: String,
    pub image_url: Option<String>,
    pub debug: Option<String>,
    /// Creation time in the digest zone.
    pub created_at: DateTime<FixedOffset>,
}

/// Outcome of one pipeline run. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub record_count: usize,
    pub summary: String,
    pub success: bool,
}

impl SummaryResult {
    /// Sentinel text for an empty window.
    pub const NOTHING_TO_SUMMARIZE: &'static str = "No new feedback to summarize.";

    pub fn empty() -> Self {
        Self {
            record_count: 0,
            summary: Self::NOTHING_TO_SUMMARIZE.to_string(),
            success: true,
        }
    }

    pub fn failed(record_count: usize) -> Self {
        Self {
            record_count,
            summary: String::new(),
            success: false,
        }
    }
}

/// What the notification adapter delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestMessage {
    pub summary: String,
    /// Job label, used as the card title.
    pub label: String,
    pub total: usize,
    /// Per-category counts, e.g. `bug×3 · 建议×1`.
    pub categories: Option<String>,
}

/// A single-turn chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Chat completion response. `content` is `None` when the provider sent nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}
