use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Config) => "config",
        Some(ConfigSource::Programmatic) => "programmatic",
        Some(ConfigSource::Default) | None => "default",
    }
}

impl Config {
    /// Effective configuration as `key → (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key)).to_string();
            config.insert(key.to_string(), (value, source));
        };

        let g = &self.generation;
        add("generation.preference", g.preference.to_string());
        if let Some(kind) = g.pinned_backend {
            add("generation.pinned_backend", kind.to_string());
        }
        add("generation.fallback_enabled", g.fallback_enabled.to_string());
        add("generation.concurrency_limit", g.concurrency_limit.to_string());
        add("generation.max_tokens", g.max_tokens.to_string());
        add("generation.temperature", g.temperature.to_string());
        add("generation.truncation_retries", g.truncation_retries.to_string());
        add("generation.call_timeout_secs", g.call_timeout_secs.to_string());
        add(
            "generation.batches",
            g.batches
                .batches()
                .iter()
                .map(|b| {
                    b.iter()
                        .map(|d| d.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .collect::<Vec<_>>()
                .join(" | "),
        );

        let r = &self.research;
        add("research.concurrency_limit", r.concurrency_limit.to_string());
        add("research.max_tokens", r.max_tokens.to_string());
        add("research.call_timeout_secs", r.call_timeout_secs.to_string());

        let p = &self.privacy;
        add("privacy.strictness", p.strictness.to_string());
        add("privacy.confidence_threshold", p.confidence_threshold.to_string());
        add("privacy.scan_timeout_secs", p.scan_timeout_secs.to_string());

        let remote = &self.providers.remote;
        add("providers.remote.model", remote.model.clone());
        add("providers.remote.base_url", remote.base_url.clone());
        add("providers.remote.api_key_env", remote.api_key_env.clone());
        add("providers.remote.web_search", remote.web_search.to_string());

        let local = &self.providers.local;
        add("providers.local.base_url", local.base_url.clone());
        add("providers.local.model", local.model.clone());

        let o = &self.output;
        add(
            "output.destinations",
            o.destinations
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
        add("output.output_dir", o.output_dir.display().to_string());
        if let Some(path) = &o.vault_path {
            add("output.vault_path", path.display().to_string());
        }
        if let Some(path) = &o.git_path {
            add("output.git_path", path.display().to_string());
        }
        if let Some(wiki) = &o.wiki {
            add("output.wiki", wiki.api_url.clone());
        }
        if let Some(path) = &self.audit.path {
            add("audit.path", path.display().to_string());
        }

        config
    }
}
