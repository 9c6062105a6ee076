//! Digest dispatch: posts an interactive card to the chat webhook.
//!
//! Card bodies use `lark_md`, restricted to bold, coloured text and links.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use pulse_core::clock;
use pulse_core::config::WebhookConfig;
use pulse_core::traits::Notifier;
use pulse_core::types::DigestMessage;
use serde_json::{Value, json};

/// Sends digests as interactive cards to an incoming-webhook URL.
pub struct WebhookNotifier {
    url: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn from_config(config: &WebhookConfig) -> Self {
        if !config.url_configured() {
            tracing::warn!("⚠️ WEBHOOK_URL is not configured; digests will not be delivered");
        }
        Self {
            url: config.url_configured().then(|| config.url.trim().to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Build the card payload for `message`, stamped with `now`.
    pub fn build_card(message: &DigestMessage, now: &DateTime<FixedOffset>) -> Value {
        let mut overview = format!(
            "**反馈总数：** <font color='red'>{}</font> 条",
            message.total
        );
        if let Some(categories) = message.categories.as_deref().filter(|c| !c.is_empty()) {
            overview.push_str(&format!("\n**分类统计：** <font color='grey'>{categories}</font>"));
        }

        json!({
            "msg_type": "interactive",
            "card": {
                "config": { "wide_screen_mode": true },
                "header": {
                    "title": { "tag": "plain_text", "content": message.label },
                    "text_tag_list": [
                        {
                            "tag": "text_tag",
                            "text": { "tag": "plain_text", "content": clock::format_local(now) },
                            "color": "neutral"
                        },
                        {
                            "tag": "text_tag",
                            "text": { "tag": "plain_text", "content": clock::weekday_name(now) },
                            "color": "blue"
                        }
                    ],
                    "template": "wathet"
                },
                "elements": [
                    { "tag": "div", "text": { "tag": "lark_md", "content": overview } },
                    { "tag": "div", "text": { "tag": "lark_md", "content": message.summary } }
                ]
            }
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &DigestMessage) -> bool {
        let Some(url) = self.url.as_deref() else {
            tracing::warn!("⚠️ Webhook URL is not configured. Set WEBHOOK_URL.");
            return false;
        };

        let payload = Self::build_card(message, &clock::now_local());
        let resp = self
            .client
            .post(url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("✅ {} digest sent to webhook", message.label);
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!("⚠️ Webhook returned an error: {status} - {body}");
                false
            }
            Err(e) => {
                tracing::warn!("⚠️ Error sending digest to webhook: {e}");
                false
            }
        }
    }
}
