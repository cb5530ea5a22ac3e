use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::{Provider, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid API response: {0}")]
    InvalidApiResponse(serde_json::Value),

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("completion cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Language model boundary. One call yields one completed document.
///
/// Implementations should stop work once `cancel` fires; the caller also drops the
/// returned future at that point.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    provider: Provider,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionsGenerator {
    /// Uses the provider's defaults and reads the key from its env var. A missing key is
    /// reported on every call rather than here.
    pub fn from_env(provider: Provider) -> Self {
        let api_key = provider.validate_api_key().ok();
        Self::new(provider, api_key)
    }

    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        let config = provider.config();
        Self {
            client: reqwest::Client::new(),
            provider,
            api_url: config.api_url.to_string(),
            model: config.model.to_string(),
            api_key,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": request.system,
                    },
                    {
                        "role": "user",
                        "content": request.prompt,
                    },
                ],
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| GenerationError::InvalidApiResponse(response.clone()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl SummaryGenerator for ChatCompletionsGenerator {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| self.provider.missing_api_key())?;

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            prompt_chars = request.prompt.chars().count(),
            "requesting completion"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.request(api_key, request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".into(),
            prompt: "prompt".into(),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    fn generator(server: &MockServer) -> ChatCompletionsGenerator {
        ChatCompletionsGenerator::new(Provider::Openai, Some("sk-test".into()))
            .with_api_url(format!("{}/v1/chat/completions", server.uri()))
            .with_model("test-model")
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 2048,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "__COMMENT|||hi" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = generator(&server)
            .complete(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "__COMMENT|||hi");
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let generator = ChatCompletionsGenerator::new(Provider::Openai, None)
            .with_api_url(format!("{}/v1/chat/completions", server.uri()));
        let err = generator
            .complete(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Provider(ProviderError::MissingApiKey { .. })));
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = generator(&server)
            .complete(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 429, ref body } if body == "slow down"));
    }

    #[tokio::test]
    async fn rejects_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = generator(&server)
            .complete(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidApiResponse(_)));
    }

    #[tokio::test]
    async fn cancellation_abandons_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = generator(&server)
            .complete(&request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
    }
}
