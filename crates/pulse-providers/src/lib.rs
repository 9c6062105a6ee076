//! # Pulse Providers
//!
//! Language-model access for Pulse. Any OpenAI-compatible endpoint is handled
//! by [`OpenAiCompatibleProvider`]; [`FeedbackSummarizer`] owns the prompt
//! contract used to turn feedback into a digest.

pub mod openai_compatible;
pub mod summarizer;

use std::sync::Arc;

use pulse_core::config::LlmConfig;

pub use openai_compatible::OpenAiCompatibleProvider;
pub use summarizer::FeedbackSummarizer;

/// Build the summarizer from the `[llm]` config section.
pub fn create_summarizer(config: &LlmConfig) -> FeedbackSummarizer {
    if !config.api_key_configured() {
        tracing::warn!("⚠️ AI_API_KEY is not configured; digests will be skipped until it is set");
    }
    let provider = Arc::new(OpenAiCompatibleProvider::from_config(config));
    FeedbackSummarizer::new(provider, config.model.clone())
}
