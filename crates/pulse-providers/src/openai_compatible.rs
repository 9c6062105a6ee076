//! OpenAI-compatible chat provider.
//!
//! Works against any endpoint that speaks the `/chat/completions` dialect.
//! Providers are distinguished only by base URL, model and API key.

use std::time::Duration;

use async_trait::async_trait;
use pulse_core::config::LlmConfig;
use pulse_core::error::{PulseError, Result};
use pulse_core::traits::Provider;
use pulse_core::types::{ChatRequest, ChatResponse};
use serde_json::{Value, json};

/// A chat provider for any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: String,
    /// Base URL, without trailing slash (e.g. "https://api.openai.com/v1").
    base_url: String,
    chat_path: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Build from the `[llm]` config section.
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = if config.api_key_configured() {
            config.api_key.trim().to_string()
        } else {
            String::new()
        };
        Self {
            name: "openai-compatible".to_string(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_path: "/chat/completions".to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(PulseError::ApiKeyMissing(self.name.clone()));
        }

        let body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
        });

        let url = format!("{}{}", self.base_url, self.chat_path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            PulseError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(PulseError::Provider { status, body });
        }

        let json: Value = resp.json().await.map_err(|e| {
            PulseError::EmptyResponse(format!("{} returned unreadable body: {}", self.name, e))
        })?;

        let Some(choice) = json["choices"].get(0) else {
            return Err(PulseError::EmptyResponse(format!("{} returned no choices", self.name)));
        };
        let content = choice["message"]["content"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| PulseError::EmptyResponse(format!("{} returned no content", self.name)))?;

        Ok(ChatResponse {
            content: Some(content.to_string()),
            finish_reason: choice["finish_reason"].as_str().map(String::from),
        })
    }
}
