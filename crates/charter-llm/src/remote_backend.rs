//! Hosted backend speaking the Anthropic Messages API.
//!
//! This is the only backend that can ground research with web search. When
//! search is enabled the server-side `web_search` tool is attached to every
//! request and the final text blocks of the response are joined.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

use charter_config::RemoteProviderConfig;
use charter_utils::error::LlmError;

use crate::http_client::HttpClient;
use crate::types::{GenerationParams, ProviderClient};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const WEB_SEARCH_TOOL: &str = "web_search_20250305";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct RemoteBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
    web_search: bool,
    max_searches: u32,
    health_timeout: Duration,
}

impl RemoteBackend {
    /// Create a backend from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built
    /// or the key is empty.
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "Remote provider API key is empty".to_string(),
            ));
        }
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            web_search: false,
            max_searches: 0,
            health_timeout: Duration::from_secs(5),
        })
    }

    /// Build from `[providers.remote]`, reading the key from the named
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when the variable is unset.
    pub fn new_from_config(config: &RemoteProviderConfig) -> Result<Self, LlmError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "Remote provider API key not found in environment variable '{}'",
                config.api_key_env
            ))
        })?;

        Ok(Self::new(api_key, &config.base_url, &config.model)?
            .with_health_timeout(Duration::from_secs(config.health_timeout_secs)))
    }

    /// Attach the server-side web search tool to each request.
    #[must_use]
    pub fn with_web_search(mut self, max_searches: u32) -> Self {
        self.web_search = max_searches > 0;
        self.max_searches = max_searches;
        self
    }

    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    #[cfg(test)]
    fn with_fast_retries(mut self) -> Self {
        self.client = self.client.with_backoff(Duration::from_millis(1));
        self
    }

    fn build_request(&self, prompt: &str, params: GenerationParams) -> MessagesRequest {
        let tools = self.web_search.then(|| {
            vec![Tool {
                tool_type: WEB_SEARCH_TOOL.to_string(),
                name: "web_search".to_string(),
                max_uses: self.max_searches,
            }]
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            tools,
        }
    }
}

#[async_trait]
impl ProviderClient for RemoteBackend {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, LlmError> {
        let body = self.build_request(prompt, params);
        let request = self
            .client
            .client()
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, REQUEST_TIMEOUT, "remote")
            .await?;

        let raw = response.text().await.map_err(|e| {
            LlmError::ProviderUnavailable(format!("remote response body could not be read: {e}"))
        })?;
        let parsed: MessagesResponse = serde_json::from_str(&raw).map_err(|e| {
            LlmError::ProviderRejected(format!("remote returned a malformed response: {e}"))
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
                "Remote call complete"
            );
        }

        let text = parsed
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(LlmError::ProviderRejected(
                "remote returned no text content".to_string(),
            ));
        }

        Ok(text)
    }

    fn supports_web_search(&self) -> bool {
        self.web_search
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .client()
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        self.client.probe(request, self.health_timeout).await
    }
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    tool_type: String,
    name: String,
    max_uses: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

/// Search responses interleave `server_tool_use` and `web_search_tool_result`
/// blocks with the text; only `text` blocks are kept.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> RemoteBackend {
        RemoteBackend::new("test-key".to_string(), server.uri(), "test-model")
            .unwrap()
            .with_fast_retries()
    }

    #[test]
    fn test_request_without_search_has_no_tools() {
        let backend = RemoteBackend::new("k".to_string(), "http://x", "m").unwrap();
        let body = serde_json::to_value(
            backend.build_request("hello", GenerationParams::new(100, 0.5)),
        )
        .unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 100);
    }

    #[test]
    fn test_request_with_search_attaches_tool() {
        let backend = RemoteBackend::new("k".to_string(), "http://x", "m")
            .unwrap()
            .with_web_search(3);
        let body = serde_json::to_value(
            backend.build_request("hello", GenerationParams::new(100, 0.5)),
        )
        .unwrap();
        assert_eq!(body["tools"][0]["type"], WEB_SEARCH_TOOL);
        assert_eq!(body["tools"][0]["max_uses"], 3);
    }

    #[test]
    fn test_empty_key_is_misconfiguration() {
        let err = RemoteBackend::new("  ".to_string(), "http://x", "m").err().unwrap();
        assert!(matches!(err, LlmError::Misconfiguration(_)));
    }

    #[test]
    #[serial]
    fn test_missing_key_env_is_misconfiguration() {
        let config = RemoteProviderConfig {
            api_key_env: "CHARTER_TEST_UNSET_KEY".to_string(),
            ..RemoteProviderConfig::default()
        };
        // SAFETY: serialized test; no other thread reads the environment.
        unsafe { env::remove_var("CHARTER_TEST_UNSET_KEY") };
        match RemoteBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("CHARTER_TEST_UNSET_KEY"));
            }
            Err(other) => panic!("Expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("Expected Misconfiguration, got a backend"),
        }
    }

    #[tokio::test]
    async fn test_generate_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "server_tool_use", "id": "t1", "name": "web_search", "input": {}},
                    {"type": "web_search_tool_result", "tool_use_id": "t1", "content": []},
                    {"type": "text", "text": "Findings: "},
                    {"type": "text", "text": "three grants apply."}
                ],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .mount(&server)
            .await;

        let text = backend(&server)
            .generate("research this", GenerationParams::new(256, 0.3))
            .await
            .unwrap();
        assert_eq!(text, "Findings: three grants apply.");
    }

    #[tokio::test]
    async fn test_generate_without_text_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("x", GenerationParams::new(10, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ProviderRejected(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("x", GenerationParams::new(10, 0.0))
            .await
            .unwrap_err();
        match err {
            LlmError::ProviderRejected(msg) => assert!(msg.contains("malformed")),
            other => panic!("Expected ProviderRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_web_search_support_follows_tool_attachment() {
        let plain = RemoteBackend::new("k".to_string(), "http://x", "m").unwrap();
        assert!(!plain.supports_web_search());
        let disabled = RemoteBackend::new("k".to_string(), "http://x", "m")
            .unwrap()
            .with_web_search(0);
        assert!(!disabled.supports_web_search());
        let searching = RemoteBackend::new("k".to_string(), "http://x", "m")
            .unwrap()
            .with_web_search(2);
        assert!(searching.supports_web_search());
    }

    #[tokio::test]
    async fn test_auth_failure_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("x", GenerationParams::new(10, 0.0))
            .await
            .unwrap_err();
        match err {
            LlmError::ProviderRejected(msg) => assert!(msg.contains("authentication failed")),
            other => panic!("Expected ProviderRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_check_uses_models_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        assert!(backend(&server).health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_when_unreachable() {
        let backend = RemoteBackend::new("k".to_string(), "http://127.0.0.1:1", "m")
            .unwrap()
            .with_health_timeout(Duration::from_millis(200));
        assert!(!backend.health_check().await);
    }
}
