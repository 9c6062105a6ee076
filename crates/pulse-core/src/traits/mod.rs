//! Seams to the external collaborators of the pipeline.

pub mod notifier;
pub mod provider;
pub mod store;
pub mod summarizer;

pub use notifier::Notifier;
pub use provider::Provider;
pub use store::{FeedbackSession, FeedbackStore};
pub use summarizer::Summarizer;
