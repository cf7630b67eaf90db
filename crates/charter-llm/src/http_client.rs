//! Shared HTTP client for the HTTP-based providers
//!
//! One `reqwest::Client` is built per backend and reused for every call,
//! with a retry policy for server errors and transport failures.

use charter_utils::error::LlmError;
use charter_utils::redaction::redact_error_message;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default maximum HTTP timeout (5 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retry attempts for 5xx and network failures
const MAX_RETRIES: u32 = 2;

/// Initial backoff duration for retries (1 second)
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Shared HTTP client for LLM providers
///
/// Provides:
/// - Connection reuse
/// - Per-request timeouts capped by a global maximum
/// - Linear backoff retries for 5xx and network errors
/// - No retries for 4xx errors
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
    backoff: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// Create a new HTTP client with a custom maximum timeout
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
            backoff: INITIAL_BACKOFF,
        })
    }

    /// Override the retry backoff step.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Execute an HTTP request with timeout and retry policy
    ///
    /// - Per-request timeout: `min(request_timeout, max_timeout)`
    /// - Up to 2 retries for 5xx and network failures, backing off 1s then 2s
    /// - 4xx responses fail immediately
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderRejected` for any 4xx
    /// - `LlmError::ProviderUnavailable` for 5xx or network errors after retries
    /// - `LlmError::ProviderTimeout` when the request times out
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| {
                    LlmError::ProviderUnavailable("Failed to clone request for retry".to_string())
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| {
                    LlmError::Misconfiguration(format!("Failed to build request: {}", e))
                })?;

            debug!(
                provider = provider_name,
                attempt = attempt,
                timeout_secs = effective_timeout.as_secs(),
                "Executing HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(map_client_error(status, provider_name, &body));
                    }

                    if status.is_server_error() {
                        let error = LlmError::ProviderUnavailable(format!(
                            "{} returned server error: {}",
                            provider_name, status
                        ));

                        if attempt <= MAX_RETRIES {
                            warn!(
                                provider = provider_name,
                                attempt = attempt,
                                status = status.as_u16(),
                                "Server error, will retry"
                            );
                            tokio::time::sleep(self.backoff * attempt).await;
                            continue;
                        }

                        return Err(error);
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(LlmError::ProviderTimeout {
                            duration: effective_timeout,
                        });
                    }

                    let error = LlmError::ProviderUnavailable(format!(
                        "{} request failed: {}",
                        provider_name,
                        redact_error_message(&e.to_string())
                    ));

                    if attempt <= MAX_RETRIES {
                        warn!(
                            provider = provider_name,
                            attempt = attempt,
                            error = %redact_error_message(&e.to_string()),
                            "Network error, will retry"
                        );
                        tokio::time::sleep(self.backoff * attempt).await;
                        continue;
                    }

                    return Err(error);
                }
            }
        }
    }

    /// Single GET with a short timeout and no retries. `true` on 2xx.
    pub async fn probe(&self, request_builder: reqwest::RequestBuilder, timeout: Duration) -> bool {
        match request_builder.timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %redact_error_message(&e.to_string()), "Health probe failed");
                false
            }
        }
    }
}

/// Map 4xx responses to `ProviderRejected`, keeping the status and a short
/// redacted excerpt of the body.
fn map_client_error(status: StatusCode, provider_name: &str, body: &str) -> LlmError {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "authentication failed",
        StatusCode::TOO_MANY_REQUESTS => "rate limit exceeded",
        _ => "rejected the request",
    };
    let excerpt: String = body.chars().take(200).collect();
    let excerpt = redact_error_message(excerpt.trim());
    if excerpt.is_empty() {
        LlmError::ProviderRejected(format!("{} {}: {}", provider_name, kind, status))
    } else {
        LlmError::ProviderRejected(format!(
            "{} {}: {} ({})",
            provider_name, kind, status, excerpt
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client() -> HttpClient {
        HttpClient::new()
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_http_client_with_custom_timeout() {
        let custom_timeout = Duration::from_secs(60);
        let client = HttpClient::with_max_timeout(custom_timeout).unwrap();
        assert_eq!(client.max_timeout, custom_timeout);
    }

    /// **Property: HTTP errors map to correct LlmError variants**
    #[test]
    fn test_map_401_to_rejected() {
        let error = map_client_error(StatusCode::UNAUTHORIZED, "test-provider", "");
        match error {
            LlmError::ProviderRejected(msg) => {
                assert!(msg.contains("test-provider"));
                assert!(msg.contains("401"));
                assert!(msg.contains("authentication failed"));
            }
            _ => panic!("Expected ProviderRejected error for 401, got {:?}", error),
        }
    }

    /// **Property: HTTP errors map to correct LlmError variants**
    #[test]
    fn test_map_429_to_rejected() {
        let error = map_client_error(StatusCode::TOO_MANY_REQUESTS, "test-provider", "slow down");
        match error {
            LlmError::ProviderRejected(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("rate limit"));
                assert!(msg.contains("slow down"));
            }
            _ => panic!("Expected ProviderRejected error for 429, got {:?}", error),
        }
    }

    #[test]
    fn test_client_error_body_is_redacted() {
        let key = "sk-ant-REDACTED";
        let error = map_client_error(
            StatusCode::BAD_REQUEST,
            "remote",
            &format!("invalid key {key}"),
        );
        assert!(!error.to_string().contains(key));
    }

    #[tokio::test]
    async fn test_server_errors_retried_then_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = fast_client();
        let request = client.client().post(format!("{}/v1/test", server.uri()));
        let err = client
            .execute_with_retry(request, Duration::from_secs(5), "test")
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ProviderUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad prompt"))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let request = client.client().post(format!("{}/v1/test", server.uri()));
        let err = client
            .execute_with_retry(request, Duration::from_secs(5), "test")
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ProviderRejected(ref m) if m.contains("bad prompt")));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = fast_client();
        let request = client.client().post(format!("{}/slow", server.uri()));
        let err = client
            .execute_with_retry(request, Duration::from_millis(100), "test")
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ProviderTimeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_probe_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = fast_client();
        let ok = client
            .probe(
                client.client().get(format!("{}/health", server.uri())),
                Duration::from_secs(1),
            )
            .await;
        let missing = client
            .probe(
                client.client().get(format!("{}/missing", server.uri())),
                Duration::from_secs(1),
            )
            .await;

        assert!(ok);
        assert!(!missing);
    }
}
