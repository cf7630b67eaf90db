use std::time::Duration;

use charter_utils::documents::BatchPlan;
use charter_utils::error::ConfigError;
use charter_utils::types::ProviderKind;

use super::{Config, ProviderPreference};

/// Per-run overrides supplied when a run is created.
///
/// Unset fields inherit from [`Config`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub preference: Option<ProviderPreference>,
    pub pinned_backend: Option<ProviderKind>,
    pub fallback_enabled: Option<bool>,
    pub generation_concurrency: Option<usize>,
    pub research_concurrency: Option<usize>,
    pub batches: Option<BatchPlan>,
}

impl RunOverrides {
    /// Pin generation to one backend.
    #[must_use]
    pub fn pinned(kind: ProviderKind) -> Self {
        Self {
            preference: Some(ProviderPreference::Pinned),
            pinned_backend: Some(kind),
            ..Self::default()
        }
    }
}

/// Resolved settings owned by one run.
///
/// Provider choice lives here rather than in any process-wide state, so
/// concurrent runs never see each other's preference.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub preference: ProviderPreference,
    pub pinned_backend: Option<ProviderKind>,
    pub fallback_enabled: bool,
    pub generation_concurrency: usize,
    pub research_concurrency: usize,
    pub generation_max_tokens: u32,
    pub generation_temperature: f32,
    pub research_max_tokens: u32,
    pub research_temperature: f32,
    pub truncation_retries: u32,
    pub generation_call_timeout: Duration,
    pub research_call_timeout: Duration,
    pub batches: BatchPlan,
}

impl RunSettings {
    /// Backend health-checked first for generation. `None` when pinned.
    #[must_use]
    pub fn preferred_backend(&self) -> Option<ProviderKind> {
        match self.preference {
            ProviderPreference::Local => Some(ProviderKind::Local),
            ProviderPreference::Remote => Some(ProviderKind::Remote),
            ProviderPreference::Pinned => None,
        }
    }
}

impl Config {
    /// Merge per-run overrides into a [`RunSettings`].
    pub fn run_settings(&self, overrides: &RunOverrides) -> Result<RunSettings, ConfigError> {
        let preference = overrides.preference.unwrap_or(self.generation.preference);
        let pinned_backend = overrides.pinned_backend.or(self.generation.pinned_backend);

        if preference == ProviderPreference::Pinned && pinned_backend.is_none() {
            return Err(ConfigError::MissingRequired(
                "generation.pinned_backend (required when preference = \"pinned\")".to_string(),
            ));
        }

        let generation_concurrency = overrides
            .generation_concurrency
            .unwrap_or(self.generation.concurrency_limit);
        let research_concurrency = overrides
            .research_concurrency
            .unwrap_or(self.research.concurrency_limit);
        for (key, value) in [
            ("generation.concurrency_limit", generation_concurrency),
            ("research.concurrency_limit", research_concurrency),
        ] {
            super::validation::check_concurrency(key, value)?;
        }

        let batches = overrides
            .batches
            .clone()
            .unwrap_or_else(|| self.generation.batches.clone());
        batches
            .check()
            .map_err(|reason| ConfigError::InvalidValue {
                key: "generation.batches".to_string(),
                value: reason,
            })?;

        Ok(RunSettings {
            preference,
            pinned_backend,
            fallback_enabled: overrides
                .fallback_enabled
                .unwrap_or(self.generation.fallback_enabled),
            generation_concurrency,
            research_concurrency,
            generation_max_tokens: self.generation.max_tokens,
            generation_temperature: self.generation.temperature,
            research_max_tokens: self.research.max_tokens,
            research_temperature: self.research.temperature,
            truncation_retries: self.generation.truncation_retries,
            generation_call_timeout: Duration::from_secs(self.generation.call_timeout_secs),
            research_call_timeout: Duration::from_secs(self.research.call_timeout_secs),
            batches,
        })
    }
}
