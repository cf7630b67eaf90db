use std::collections::HashMap;
use std::path::PathBuf;

use charter_utils::documents::BatchPlan;
use charter_utils::error::ConfigError;
use charter_utils::types::ProviderKind;

use super::{
    Config, ConfigSource, DestinationKind, PrivacyStrictness, ProviderPreference, WikiConfig,
};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding charter and you need behaviour that does not
    /// depend on config files in the working tree.
    ///
    /// ```rust
    /// use charter_config::{Config, ProviderPreference};
    ///
    /// let config = Config::builder()
    ///     .preference(ProviderPreference::Remote)
    ///     .fallback_enabled(false)
    ///     .generation_concurrency(2)
    ///     .build()
    ///     .expect("valid config");
    /// assert!(!config.generation.fallback_enabled);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder for [`Config`].
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
    touched: Vec<&'static str>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(mut self, key: &'static str) -> Self {
        self.touched.push(key);
        self
    }

    #[must_use]
    pub fn preference(mut self, preference: ProviderPreference) -> Self {
        self.config.generation.preference = preference;
        self.mark("generation.preference")
    }

    #[must_use]
    pub fn pinned_backend(mut self, kind: ProviderKind) -> Self {
        self.config.generation.preference = ProviderPreference::Pinned;
        self.config.generation.pinned_backend = Some(kind);
        self.mark("generation.pinned_backend")
    }

    #[must_use]
    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.config.generation.fallback_enabled = enabled;
        self.mark("generation.fallback_enabled")
    }

    #[must_use]
    pub fn generation_concurrency(mut self, limit: usize) -> Self {
        self.config.generation.concurrency_limit = limit;
        self.mark("generation.concurrency_limit")
    }

    #[must_use]
    pub fn research_concurrency(mut self, limit: usize) -> Self {
        self.config.research.concurrency_limit = limit;
        self.mark("research.concurrency_limit")
    }

    #[must_use]
    pub fn truncation_retries(mut self, retries: u32) -> Self {
        self.config.generation.truncation_retries = retries;
        self.mark("generation.truncation_retries")
    }

    #[must_use]
    pub fn generation_call_timeout_secs(mut self, secs: u64) -> Self {
        self.config.generation.call_timeout_secs = secs;
        self.mark("generation.call_timeout_secs")
    }

    #[must_use]
    pub fn research_call_timeout_secs(mut self, secs: u64) -> Self {
        self.config.research.call_timeout_secs = secs;
        self.mark("research.call_timeout_secs")
    }

    #[must_use]
    pub fn batches(mut self, plan: BatchPlan) -> Self {
        self.config.generation.batches = plan;
        self.mark("generation.batches")
    }

    #[must_use]
    pub fn strictness(mut self, strictness: PrivacyStrictness) -> Self {
        self.config.privacy.strictness = strictness;
        self.mark("privacy.strictness")
    }

    #[must_use]
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.privacy.confidence_threshold = threshold;
        self.mark("privacy.confidence_threshold")
    }

    #[must_use]
    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.providers.remote.base_url = url.into();
        self.mark("providers.remote.base_url")
    }

    #[must_use]
    pub fn local_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.providers.local.base_url = url.into();
        self.mark("providers.local.base_url")
    }

    #[must_use]
    pub fn destinations(mut self, destinations: Vec<DestinationKind>) -> Self {
        self.config.output.destinations = destinations;
        self.mark("output.destinations")
    }

    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.output_dir = dir.into();
        self.mark("output.output_dir")
    }

    #[must_use]
    pub fn vault_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.vault_path = Some(dir.into());
        self.mark("output.vault_path")
    }

    #[must_use]
    pub fn git_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.git_path = Some(dir.into());
        self.mark("output.git_path")
    }

    #[must_use]
    pub fn wiki(mut self, wiki: WikiConfig) -> Self {
        self.config.output.wiki = Some(wiki);
        self.mark("output.wiki")
    }

    #[must_use]
    pub fn audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit.path = Some(path.into());
        self.mark("audit.path")
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = self.config;
        let mut attribution: HashMap<String, ConfigSource> = HashMap::new();
        for key in self.touched {
            attribution.insert(key.to_string(), ConfigSource::Programmatic);
        }
        config.source_attribution = attribution;
        config.validate()?;
        Ok(config)
    }
}
