//! # Pulse Core
//!
//! Shared building blocks for the feedback digest pipeline:
//! configuration, the error type, the fixed UTC+8 clock, data types and the
//! traits that sit at the seams to storage, the language model and the webhook.

pub mod clock;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{PulseConfig, ScheduleHours};
pub use error::{PulseError, Result};
pub use types::{ChatRequest, ChatResponse, DigestMessage, FeedbackRecord, SummaryResult};
