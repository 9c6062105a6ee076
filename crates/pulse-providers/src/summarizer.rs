//! Feedback summarizer: prompt contract on top of a chat [`Provider`].

use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::error::PulseError;
use pulse_core::traits::{Provider, Summarizer};
use pulse_core::types::{ChatRequest, FeedbackRecord, SummaryResult};

/// Fixed system role for every summary request.
pub const SYSTEM_PROMPT: &str = "你是一个AI助手，负责将用户反馈总结成带有emoji的中文纯文本。";

const INSTRUCTIONS: &str = "请总结以下用户反馈条目。
识别关键问题、常见抱怨和任何积极的反馈。
提供一个简洁的、适合报告的摘要。总结内容请使用中文纯文本段落，不要使用标题或列表。
只使用以下emoji标注语句，每类一个：
✅ 已确认的积极反馈
⚠️ 需要注意的问题
💡 用户提出的建议
❓ 含义不明确的反馈
🔁 多名用户反复提到的常见抱怨
总结中不要包括任何用户信息（用户ID、设备ID、渠道、User-Agent等），只描述反馈正文。
需要精准描述反馈，不要给出改进意见。如有图片请提及并给出markdown格式超链接。切记是总结。";

/// Summarizes feedback through an OpenAI-compatible model.
pub struct FeedbackSummarizer {
    provider: Arc<dyn Provider>,
    model: String,
}

impl FeedbackSummarizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Build the user prompt for a batch of records.
    pub fn build_prompt(records: &[FeedbackRecord]) -> String {
        let entries: Vec<String> = records
            .iter()
            .map(|fb| {
                format!(
                    "(版本: {}, 类型: {}, 上传的图片链接: {}) 的反馈:\n{}",
                    fb.app_version,
                    fb.feedback_type,
                    fb.image_url.as_deref().filter(|u| !u.is_empty()).unwrap_or("无"),
                    fb.feedback.trim()
                )
            })
            .collect();

        format!(
            "{INSTRUCTIONS}\n反馈条目:\n{}\n\n摘要:\n",
            entries.join("\n---\n")
        )
    }
}

#[async_trait]
impl Summarizer for FeedbackSummarizer {
    async fn summarize(&self, records: &[FeedbackRecord]) -> Option<String> {
        if records.is_empty() {
            return Some(SummaryResult::NOTHING_TO_SUMMARIZE.to_string());
        }

        let request = ChatRequest {
            model: self.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: Self::build_prompt(records),
        };

        tracing::debug!(
            "🧠 Summarizing {} feedback entries with '{}' via {}",
            records.len(),
            self.model,
            self.provider.name()
        );

        match self.provider.chat(&request).await {
            Ok(resp) => match resp.content.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => Some(text.to_string()),
                _ => {
                    tracing::warn!(
                        "⚠️ {} returned an empty or unexpected response",
                        self.provider.name()
                    );
                    None
                }
            },
            Err(PulseError::ApiKeyMissing(name)) => {
                tracing::warn!("⚠️ AI API key is not configured for {name}. Set AI_API_KEY.");
                None
            }
            Err(PulseError::Provider { status, body }) => {
                tracing::warn!(
                    "⚠️ {} status error: {status}, response body: {body}",
                    self.provider.name()
                );
                None
            }
            Err(PulseError::EmptyResponse(detail)) => {
                tracing::warn!("⚠️ Empty or unexpected response: {detail}");
                None
            }
            Err(PulseError::Http(e)) => {
                tracing::warn!("⚠️ {} transport error: {e}", self.provider.name());
                None
            }
            Err(e) => {
                tracing::error!(
                    "❌ Unexpected error while summarizing via {}: {e:?}",
                    self.provider.name()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use pulse_core::error::Result;
    use pulse_core::types::ChatResponse;
    use std::sync::Mutex;

    struct StubProvider {
        reply: Mutex<Option<Result<ChatResponse>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl StubProvider {
        fn new(reply: Result<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(ChatResponse::default()))
        }
    }

    fn record(kind: &str, text: &str, image: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            id: 1,
            user_uid: "uid-secret-42".into(),
            device_id: 777,
            app_version: "2.3.1".into(),
            app_channel: "appstore".into(),
            user_agent: "Mozilla/5.0".into(),
            feedback_type: kind.into(),
            feedback: text.into(),
            image_url: image.map(String::from),
            debug: None,
            created_at: FixedOffset::east_opt(8 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .unwrap(),
        }
    }

    fn content(text: &str) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: Some(text.into()),
            finish_reason: Some("stop".into()),
        })
    }

    #[test]
    fn test_prompt_embeds_category_body_and_image() {
        let prompt = FeedbackSummarizer::build_prompt(&[
            record("bug", "登录闪退", Some("https://img.example.com/a.png")),
            record("建议", "希望增加夜间模式", None),
        ]);
        assert!(prompt.contains("类型: bug"));
        assert!(prompt.contains("登录闪退"));
        assert!(prompt.contains("https://img.example.com/a.png"));
        assert!(prompt.contains("上传的图片链接: 无"));
        assert!(prompt.contains("\n---\n"));
        for emoji in ["✅", "⚠️", "💡", "❓", "🔁"] {
            assert!(prompt.contains(emoji), "missing {emoji}");
        }
    }

    #[test]
    fn test_prompt_omits_identifying_fields() {
        let prompt = FeedbackSummarizer::build_prompt(&[record("bug", "卡顿", None)]);
        assert!(!prompt.contains("uid-secret-42"));
        assert!(!prompt.contains("777"));
        assert!(!prompt.contains("appstore"));
        assert!(!prompt.contains("Mozilla"));
    }

    #[tokio::test]
    async fn test_summarize_trims_response() {
        let provider = StubProvider::new(content("\n  ⚠️ 登录闪退问题集中出现。 \n"));
        let summarizer = FeedbackSummarizer::new(provider.clone(), "grok-3-mini");
        let summary = summarizer.summarize(&[record("bug", "登录闪退", None)]).await;
        assert_eq!(summary.as_deref(), Some("⚠️ 登录闪退问题集中出现。"));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "grok-3-mini");
        assert_eq!(seen[0].system_prompt, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_failures_collapse_to_none() {
        let failures = vec![
            Err(PulseError::ApiKeyMissing("stub".into())),
            Err(PulseError::Http("connection refused".into())),
            Err(PulseError::Provider { status: 500, body: "oops".into() }),
            Err(PulseError::EmptyResponse("stub returned no choices".into())),
            content("   "),
            Ok(ChatResponse::default()),
        ];
        for reply in failures {
            let summarizer = FeedbackSummarizer::new(StubProvider::new(reply), "m");
            assert!(summarizer.summarize(&[record("bug", "x", None)]).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_provider() {
        let provider = StubProvider::new(content("unused"));
        let summarizer = FeedbackSummarizer::new(provider.clone(), "m");
        let summary = summarizer.summarize(&[]).await;
        assert_eq!(summary.as_deref(), Some(SummaryResult::NOTHING_TO_SUMMARIZE));
        assert!(provider.seen.lock().unwrap().is_empty());
    }
}
