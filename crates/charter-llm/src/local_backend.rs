//! Self-hosted backend for a llama.cpp server's OpenAI-compatible API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use charter_config::LocalProviderConfig;
use charter_utils::error::LlmError;

use crate::http_client::HttpClient;
use crate::types::{GenerationParams, ProviderClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct LocalBackend {
    client: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
    health_timeout: Duration,
}

impl LocalBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            health_timeout: Duration::from_secs(5),
        })
    }

    /// Build from `[providers.local]`. A configured but unset key variable is
    /// a misconfiguration.
    pub fn new_from_config(config: &LocalProviderConfig) -> Result<Self, LlmError> {
        let mut backend = Self::new(&config.base_url, &config.model)?
            .with_health_timeout(Duration::from_secs(config.health_timeout_secs));

        if let Some(var) = &config.api_key_env {
            let key = env::var(var).map_err(|_| {
                LlmError::Misconfiguration(format!(
                    "Local provider API key not found in environment variable '{var}'"
                ))
            })?;
            backend.api_key = Some(key);
        }

        Ok(backend)
    }

    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl ProviderClient for LocalBackend {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self.authorize(
            self.client
                .client()
                .post(format!("{}/v1/chat/completions", self.base_url))
                .json(&body),
        );

        let response = self
            .client
            .execute_with_retry(request, REQUEST_TIMEOUT, "local")
            .await?;

        let raw = response.text().await.map_err(|e| {
            LlmError::ProviderUnavailable(format!("local response body could not be read: {e}"))
        })?;
        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            LlmError::ProviderRejected(format!("local returned a malformed response: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::ProviderRejected(
                "local returned an empty completion".to_string(),
            ));
        }

        Ok(content)
    }

    fn supports_web_search(&self) -> bool {
        false
    }

    /// llama.cpp exposes `/health`; older builds only answer `/v1/models`.
    async fn health_check(&self) -> bool {
        let health = self.authorize(
            self.client
                .client()
                .get(format!("{}/health", self.base_url)),
        );
        if self.client.probe(health, self.health_timeout).await {
            return true;
        }

        let models = self.authorize(
            self.client
                .client()
                .get(format!("{}/v1/models", self.base_url)),
        );
        self.client.probe(models, self.health_timeout).await
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"model": "llama", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "# Readme\n\nDone."}}]
            })))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "llama").unwrap();
        let text = backend
            .generate("write", GenerationParams::new(512, 0.7))
            .await
            .unwrap();
        assert_eq!(text, "# Readme\n\nDone.");
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "llama").unwrap();
        let err = backend
            .generate("write", GenerationParams::new(512, 0.7))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ProviderRejected(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("model loading..."))
            .expect(1)
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "llama").unwrap();
        let err = backend
            .generate("write", GenerationParams::new(512, 0.7))
            .await
            .unwrap_err();
        match err {
            LlmError::ProviderRejected(msg) => assert!(msg.contains("malformed")),
            other => panic!("Expected ProviderRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("authorization", "Bearer tunnel-token"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut backend = LocalBackend::new(server.uri(), "llama").unwrap();
        backend.api_key = Some("tunnel-token".to_string());
        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn test_health_falls_back_to_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "llama").unwrap();
        assert!(backend.health_check().await);
        assert!(!backend.supports_web_search());
    }

    #[tokio::test]
    async fn test_health_false_while_loading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "llama")
            .unwrap()
            .with_health_timeout(Duration::from_millis(500));
        assert!(!backend.health_check().await);
    }
}
