//! Highlight selectors.
//!
//! A selector turns a transcript into untrusted highlight candidates with one
//! language-model call. Zero usable candidates is an empty `Vec`, never an
//! error. Retries are applied by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reelforge_common::config::{AppConfig, HighlightConfig, SelectorProviderKind};
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_common::http::{build_client, classify_transport, ensure_success};
use reelforge_media_model::{HighlightCandidate, Transcript};

use crate::parse::parse_candidates;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};

/// Model used for the Anthropic backend when the configured model names an
/// OpenAI model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Duration bounds and output language passed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConstraints {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    /// Language for hooks and summaries.
    pub language: String,
}

impl SelectionConstraints {
    pub fn from_config(config: &HighlightConfig, language: impl Into<String>) -> Self {
        Self {
            min_duration_secs: config.min_duration,
            max_duration_secs: config.max_duration,
            language: language.into(),
        }
    }
}

/// Highlight selection capability.
#[async_trait]
pub trait HighlightSelector: Send + Sync {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    async fn select(
        &self,
        transcript: &Transcript,
        desired_count: usize,
        constraints: &SelectionConstraints,
    ) -> ReelResult<Vec<HighlightCandidate>>;
}

/// OpenAI chat completions backend.
#[derive(Debug, Clone)]
pub struct OpenAiSelector {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSelector {
    pub const NAME: &'static str = "openai-chat";

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> ReelResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReelError::unavailable(
                Self::NAME,
                "OpenAI API key not found; set OPENAI_API_KEY or api.openai_api_key",
            ));
        }
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
        })
    }

    async fn complete(&self, prompt: &str) -> ReelResult<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;
        let response: ChatResponse = ensure_success(Self::NAME, response)
            .await?
            .json()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;

        chat_content(response)
    }
}

/// Text of the first choice.
fn chat_content(response: ChatResponse) -> ReelResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            ReelError::invalid_response(OpenAiSelector::NAME, "response has no message content")
        })
}

#[async_trait]
impl HighlightSelector for OpenAiSelector {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn select(
        &self,
        transcript: &Transcript,
        desired_count: usize,
        constraints: &SelectionConstraints,
    ) -> ReelResult<Vec<HighlightCandidate>> {
        if transcript.is_empty() || desired_count == 0 {
            return Ok(vec![]);
        }
        tracing::info!(model = %self.model, desired_count, "Selecting highlights with OpenAI");
        let prompt = build_prompt(transcript, desired_count, constraints);
        let content = self.complete(&prompt).await?;
        parse_candidates(Self::NAME, &content)
    }
}

/// Anthropic messages API backend.
#[derive(Debug, Clone)]
pub struct AnthropicSelector {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicSelector {
    pub const NAME: &'static str = "anthropic-messages";

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> ReelResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReelError::unavailable(
                Self::NAME,
                "Anthropic API key not found; set ANTHROPIC_API_KEY or api.anthropic_api_key",
            ));
        }
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: temperature.clamp(0.0, 1.0),
        })
    }

    async fn complete(&self, prompt: &str) -> ReelResult<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: self.temperature,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;
        let response: MessagesResponse = ensure_success(Self::NAME, response)
            .await?
            .json()
            .await
            .map_err(|e| classify_transport(Self::NAME, e))?;

        messages_text(response)
    }
}

/// Text of the first `text` block; other block kinds are skipped.
fn messages_text(response: MessagesResponse) -> ReelResult<String> {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .ok_or_else(|| {
            ReelError::invalid_response(AnthropicSelector::NAME, "response has no text block")
        })
}

#[async_trait]
impl HighlightSelector for AnthropicSelector {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn select(
        &self,
        transcript: &Transcript,
        desired_count: usize,
        constraints: &SelectionConstraints,
    ) -> ReelResult<Vec<HighlightCandidate>> {
        if transcript.is_empty() || desired_count == 0 {
            return Ok(vec![]);
        }
        tracing::info!(model = %self.model, desired_count, "Selecting highlights with Anthropic");
        let prompt = build_prompt(transcript, desired_count, constraints);
        let content = self.complete(&prompt).await?;
        parse_candidates(Self::NAME, &content)
    }
}

/// Selector backend chosen from configuration.
#[derive(Debug, Clone)]
pub enum SelectorBackend {
    OpenAi(OpenAiSelector),
    Anthropic(AnthropicSelector),
}

impl SelectorBackend {
    pub fn from_config(config: &AppConfig) -> ReelResult<Self> {
        let h = &config.highlights;
        let timeout = config.api.request_timeout_secs;
        match h.provider {
            SelectorProviderKind::OpenAi => Ok(Self::OpenAi(OpenAiSelector::new(
                config.api.openai_api_key.clone().unwrap_or_default(),
                config.api.openai_base_url.clone(),
                h.model.clone(),
                h.temperature,
                timeout,
            )?)),
            SelectorProviderKind::Anthropic => {
                let model = if h.model.starts_with("gpt-") {
                    DEFAULT_ANTHROPIC_MODEL.to_string()
                } else {
                    h.model.clone()
                };
                Ok(Self::Anthropic(AnthropicSelector::new(
                    config.api.anthropic_api_key.clone().unwrap_or_default(),
                    config.api.anthropic_base_url.clone(),
                    model,
                    h.temperature,
                    timeout,
                )?))
            }
        }
    }
}

#[async_trait]
impl HighlightSelector for SelectorBackend {
    fn name(&self) -> &str {
        match self {
            Self::OpenAi(s) => s.name(),
            Self::Anthropic(s) => s.name(),
        }
    }

    async fn select(
        &self,
        transcript: &Transcript,
        desired_count: usize,
        constraints: &SelectionConstraints,
    ) -> ReelResult<Vec<HighlightCandidate>> {
        match self {
            Self::OpenAi(s) => s.select(transcript, desired_count, constraints).await,
            Self::Anthropic(s) => s.select(transcript, desired_count, constraints).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(provider: SelectorProviderKind) -> AppConfig {
        let mut config = AppConfig::default();
        config.highlights.provider = provider;
        config.api.openai_api_key = Some("sk-test".to_string());
        config.api.anthropic_api_key = Some("sk-ant-test".to_string());
        config
    }

    #[test]
    fn test_backend_follows_config() {
        let openai = SelectorBackend::from_config(&config_with(SelectorProviderKind::OpenAi)).unwrap();
        assert_eq!(openai.name(), OpenAiSelector::NAME);

        let anthropic =
            SelectorBackend::from_config(&config_with(SelectorProviderKind::Anthropic)).unwrap();
        assert_eq!(anthropic.name(), AnthropicSelector::NAME);
        match anthropic {
            SelectorBackend::Anthropic(s) => assert_eq!(s.model, DEFAULT_ANTHROPIC_MODEL),
            _ => panic!("expected Anthropic backend"),
        }
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let mut config = config_with(SelectorProviderKind::Anthropic);
        config.api.anthropic_api_key = None;
        let err = SelectorBackend::from_config(&config).unwrap_err();
        assert!(matches!(err, ReelError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_transcript_selects_nothing_without_calling() {
        // Unroutable base URL: any request would fail.
        let selector =
            OpenAiSelector::new("sk-test", "http://127.0.0.1:9", "gpt-4o-mini", 0.3, 1).unwrap();
        let constraints = SelectionConstraints {
            min_duration_secs: 6.0,
            max_duration_secs: 60.0,
            language: "en".to_string(),
        };
        let candidates = selector
            .select(&Transcript::new("en", vec![]), 5, &constraints)
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    fn chat(json: &str) -> ReelResult<String> {
        chat_content(serde_json::from_str(json).unwrap())
    }

    fn messages(json: &str) -> ReelResult<String> {
        messages_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_chat_content_takes_first_choice() {
        let text = chat(
            r#"{"choices": [
                {"message": {"role": "assistant", "content": "[{\"start_time\": 1}]"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(text, r#"[{"start_time": 1}]"#);
    }

    #[test]
    fn test_chat_without_content_is_invalid_response() {
        for json in [
            r#"{"choices": []}"#,
            r#"{}"#,
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
            r#"{"choices": [{"message": {"role": "assistant"}}]}"#,
        ] {
            let err = chat(json).unwrap_err();
            assert!(
                matches!(err, ReelError::ProviderInvalidResponse { .. }),
                "{json}: {err:?}"
            );
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_messages_skip_non_text_blocks() {
        let text = messages(
            r#"{"content": [
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                {"type": "text", "text": "[]"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(text, "[]");
    }

    #[test]
    fn test_messages_without_text_block_is_invalid_response() {
        for json in [
            r#"{"content": []}"#,
            r#"{"content": [{"type": "tool_use", "id": "t1", "name": "lookup", "input": {}}]}"#,
            r#"{"content": [{"type": "text"}]}"#,
        ] {
            let err = messages(json).unwrap_err();
            assert!(
                matches!(err, ReelError::ProviderInvalidResponse { .. }),
                "{json}: {err:?}"
            );
        }
    }
}
