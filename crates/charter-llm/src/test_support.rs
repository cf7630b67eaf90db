//! Scriptable in-memory provider for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use charter_utils::error::LlmError;

use crate::types::{GenerationParams, ProviderClient};

/// Completion body returned when no responder is set.
pub const DEFAULT_REPLY: &str =
    "# Generated\n\n## Overview\n\nThis section was produced by the mock provider.\n";

/// One scripted reply: an optional delay, then a result.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub result: Result<String, LlmError>,
}

impl MockReply {
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(text.into()),
        }
    }

    #[must_use]
    pub fn err(error: LlmError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = Box<dyn Fn(&str) -> MockReply + Send + Sync>;

/// A [`ProviderClient`] whose replies are computed from the prompt.
pub struct MockProvider {
    responder: Responder,
    healthy: AtomicBool,
    web_search: bool,
    calls: AtomicUsize,
    health_checks: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            responder: Box::new(|_| MockReply::ok(DEFAULT_REPLY)),
            healthy: AtomicBool::new(true),
            web_search: false,
            calls: AtomicUsize::new(0),
            health_checks: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn healthy(self, healthy: bool) -> Self {
        self.healthy.store(healthy, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    #[must_use]
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    /// Every call fails with `error`.
    #[must_use]
    pub fn failing(self, error: LlmError) -> Self {
        self.with_responder(move |_| MockReply::err(error.clone()))
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    /// Prompts in the order calls started.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = (self.responder)(prompt);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    fn supports_web_search(&self) -> bool {
        self.web_search
    }

    async fn health_check(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }
}
