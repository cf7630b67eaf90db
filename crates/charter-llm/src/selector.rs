//! Per-call backend selection with health-gated failover.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use charter_config::{Config, RunSettings};
use charter_utils::error::LlmError;
use charter_utils::types::{ProviderKind, RunId};

use crate::local_backend::LocalBackend;
use crate::remote_backend::RemoteBackend;
use crate::types::ProviderClient;

/// Why a backend was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Research always uses the search-capable backend.
    Research,
    /// The run pins a backend; no health check was made.
    Pinned,
    /// The preferred backend passed its health check.
    Healthy,
    /// The preferred backend failed its health check.
    Fallback,
}

impl SelectionReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Pinned => "pinned",
            Self::Healthy => "healthy",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one selection.
#[derive(Clone)]
pub struct SelectedProvider {
    pub kind: ProviderKind,
    pub client: Arc<dyn ProviderClient>,
    pub reason: SelectionReason,
}

impl fmt::Debug for SelectedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedProvider")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Health of both backends at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub local: bool,
    pub remote: bool,
}

/// Chooses a backend for every provider call.
///
/// The selector holds no per-run state. Preference, pinning and fallback
/// come from the caller's [`RunSettings`], so concurrent runs with different
/// settings share one selector safely.
#[derive(Clone)]
pub struct ProviderSelector {
    local: Arc<dyn ProviderClient>,
    remote: Arc<dyn ProviderClient>,
    research: Arc<dyn ProviderClient>,
}

impl ProviderSelector {
    /// Research goes to `remote`.
    pub fn new(local: Arc<dyn ProviderClient>, remote: Arc<dyn ProviderClient>) -> Self {
        Self {
            local,
            research: Arc::clone(&remote),
            remote,
        }
    }

    /// Use a distinct remote client for research, e.g. one with the search
    /// tool attached.
    #[must_use]
    pub fn with_research_client(mut self, research: Arc<dyn ProviderClient>) -> Self {
        self.research = research;
        self
    }

    /// Build both HTTP backends from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when a backend cannot be
    /// constructed, most often because the remote API key is unset.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let remote_cfg = &config.providers.remote;
        let local = LocalBackend::new_from_config(&config.providers.local)?;
        let remote = RemoteBackend::new_from_config(remote_cfg)?;
        let mut research = RemoteBackend::new_from_config(remote_cfg)?;
        if remote_cfg.web_search {
            research = research.with_web_search(remote_cfg.max_searches);
        }

        Ok(Self::new(Arc::new(local), Arc::new(remote)).with_research_client(Arc::new(research)))
    }

    #[must_use]
    pub fn client(&self, kind: ProviderKind) -> Arc<dyn ProviderClient> {
        match kind {
            ProviderKind::Local => Arc::clone(&self.local),
            ProviderKind::Remote => Arc::clone(&self.remote),
        }
    }

    /// Always the remote, search-capable backend. No failover.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the research client cannot
    /// search the web.
    pub fn select_for_research(&self, run_id: &RunId) -> Result<SelectedProvider, LlmError> {
        if !self.research.supports_web_search() {
            return Err(LlmError::Misconfiguration(
                "research requires a backend with web search".to_string(),
            ));
        }
        info!(
            run_id = %run_id,
            selected = ProviderKind::Remote.as_str(),
            reason = SelectionReason::Research.as_str(),
            "Provider selected"
        );
        Ok(SelectedProvider {
            kind: ProviderKind::Remote,
            client: Arc::clone(&self.research),
            reason: SelectionReason::Research,
        })
    }

    /// Choose the generation backend for one call.
    ///
    /// Pinned runs get their backend unconditionally. Otherwise the preferred
    /// backend is health-checked; a failure falls over to the other backend
    /// when the run allows it.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::NoProviderAvailable` when the preferred backend is
    /// unhealthy and fallback is disabled.
    pub async fn select_for_generation(
        &self,
        run_id: &RunId,
        settings: &RunSettings,
    ) -> Result<SelectedProvider, LlmError> {
        let selected = match (settings.pinned_backend, settings.preferred_backend()) {
            (Some(pinned), None) => SelectedProvider {
                kind: pinned,
                client: self.client(pinned),
                reason: SelectionReason::Pinned,
            },
            (_, preferred) => {
                let preferred = preferred.unwrap_or(ProviderKind::Local);
                if self.client(preferred).health_check().await {
                    SelectedProvider {
                        kind: preferred,
                        client: self.client(preferred),
                        reason: SelectionReason::Healthy,
                    }
                } else if settings.fallback_enabled {
                    let fallback = preferred.other();
                    SelectedProvider {
                        kind: fallback,
                        client: self.client(fallback),
                        reason: SelectionReason::Fallback,
                    }
                } else {
                    warn!(
                        run_id = %run_id,
                        preferred = preferred.as_str(),
                        reason = "hard-fail",
                        "No generation provider available"
                    );
                    return Err(LlmError::NoProviderAvailable(format!(
                        "{preferred} backend failed its health check and fallback is disabled"
                    )));
                }
            }
        };

        info!(
            run_id = %run_id,
            selected = selected.kind.as_str(),
            reason = selected.reason.as_str(),
            "Provider selected"
        );
        Ok(selected)
    }

    /// Probe both backends concurrently.
    pub async fn health_report(&self) -> HealthReport {
        let (local, remote) = tokio::join!(self.local.health_check(), self.remote.health_check());
        HealthReport { local, remote }
    }
}
