use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::config::ChatProviderConfig;
use crate::error::{AppError, Result};
use crate::llm::upstream_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the assistant text
    async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String>;

    /// Provider name for logs and stored metadata
    fn provider(&self) -> &str;

    /// Model name
    fn model(&self) -> &str;
}

/// Chat Completions client (OpenAI, Perplexity)
pub struct ChatCompletionClient {
    client: reqwest::Client,
    provider: String,
    config: ChatProviderConfig,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(provider: &str, config: ChatProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            provider: provider.to_string(),
            config,
        })
    }

    pub fn openai(config: &ChatProviderConfig) -> Result<Self> {
        Self::new("openai", config.clone())
    }

    pub fn perplexity(config: &ChatProviderConfig) -> Result<Self> {
        Self::new("perplexity", config.clone())
    }
}

#[async_trait]
impl ChatModel for ChatCompletionClient {
    #[instrument(skip(self, messages, options), fields(provider = %self.provider, model = %self.config.model))]
    async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(AppError::Config(format!(
                "{} API key is not configured",
                self.provider
            )));
        }

        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature.unwrap_or(self.config.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(&self.provider, response).await);
        }

        let body: CompletionResponse = response.json().await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "completion received");

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| AppError::Upstream(format!("{} returned no choices", self.provider)))
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(uri: String) -> ChatProviderConfig {
        ChatProviderConfig {
            base_url: uri,
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 100,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "temperature": 0.2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Olá!  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::openai(&config(server.uri())).unwrap();
        let options = ChatOptions {
            temperature: Some(0.2),
            ..Default::default()
        };
        let answer = client
            .complete(&[ChatMessage::user("oi")], &options)
            .await
            .unwrap();
        assert_eq!(answer, "Olá!");
    }

    #[tokio::test]
    async fn test_upstream_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::perplexity(&config(server.uri())).unwrap();
        let err = client
            .complete(&[ChatMessage::user("oi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamRateLimited));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let mut cfg = config("http://127.0.0.1:1".into());
        cfg.api_key.clear();
        let client = ChatCompletionClient::openai(&cfg).unwrap();
        let err = client
            .complete(&[ChatMessage::user("oi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
