//! Pulse error types.

use thiserror::Error;

/// Errors raised across the digest pipeline.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key missing for provider '{0}'")]
    ApiKeyMissing(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;

impl PulseError {
    /// Coarse failure class used in log lines.
    pub fn class(&self) -> &'static str {
        match self {
            PulseError::Config(_) | PulseError::ApiKeyMissing(_) => "config",
            PulseError::Http(_) => "transport",
            PulseError::Provider { .. } | PulseError::EmptyResponse(_) => "response",
            PulseError::Storage(_) | PulseError::Io(_) | PulseError::Json(_) => "internal",
        }
    }
}
