use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use charter_utils::documents::BatchPlan;
use charter_utils::error::ConfigError;
use charter_utils::types::ProviderKind;

use super::{
    AuditConfig, CliArgs, Config, ConfigSource, DestinationKind, GenerationConfig,
    OutputConfig, PrivacyConfig, PrivacyStrictness, ProviderPreference, ProvidersConfig,
    ResearchConfig, WikiConfig,
};

/// TOML configuration file structure. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    generation: Option<TomlGeneration>,
    research: Option<TomlResearch>,
    privacy: Option<TomlPrivacy>,
    providers: Option<TomlProviders>,
    output: Option<TomlOutput>,
    audit: Option<AuditConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGeneration {
    preference: Option<ProviderPreference>,
    pinned_backend: Option<ProviderKind>,
    fallback_enabled: Option<bool>,
    concurrency_limit: Option<usize>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    truncation_retries: Option<u32>,
    call_timeout_secs: Option<u64>,
    batches: Option<BatchPlan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlResearch {
    concurrency_limit: Option<usize>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    call_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPrivacy {
    strictness: Option<PrivacyStrictness>,
    confidence_threshold: Option<f64>,
    scan_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProviders {
    remote: Option<TomlRemote>,
    local: Option<TomlLocal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRemote {
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    web_search: Option<bool>,
    max_searches: Option<u32>,
    health_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLocal {
    base_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    health_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlOutput {
    destinations: Option<Vec<DestinationKind>>,
    output_dir: Option<PathBuf>,
    vault_path: Option<PathBuf>,
    git_path: Option<PathBuf>,
    wiki: Option<WikiConfig>,
}

/// Overwrite `$target` with `$value` when present and record the source.
macro_rules! apply {
    ($attr:expr, $src:expr, $key:literal, $target:expr, $value:expr) => {
        if let Some(v) = $value {
            $target = v;
            $attr.insert($key.to_string(), $src.clone());
        }
    };
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        let file_config = match &config_path {
            Some(path) => Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?,
            None => TomlConfig::default(),
        };

        let config = Self::merge(file_config, cli_args);
        config.validate()?;
        Ok(config)
    }

    /// Apply file values over defaults, then CLI values over both.
    fn merge(file: TomlConfig, cli: &CliArgs) -> Self {
        let mut attr: HashMap<String, ConfigSource> = HashMap::new();
        let mut generation = GenerationConfig::default();
        let mut research = ResearchConfig::default();
        let mut privacy = PrivacyConfig::default();
        let mut providers = ProvidersConfig::default();
        let mut output = OutputConfig::default();
        let mut audit = AuditConfig::default();

        for key in [
            "generation.preference",
            "generation.fallback_enabled",
            "generation.concurrency_limit",
            "generation.max_tokens",
            "generation.temperature",
            "generation.truncation_retries",
            "generation.call_timeout_secs",
            "generation.batches",
            "research.concurrency_limit",
            "research.max_tokens",
            "research.call_timeout_secs",
            "privacy.strictness",
            "privacy.confidence_threshold",
            "privacy.scan_timeout_secs",
            "providers.remote.model",
            "providers.remote.base_url",
            "providers.remote.web_search",
            "providers.local.base_url",
            "providers.local.model",
            "output.destinations",
            "output.output_dir",
        ] {
            attr.insert(key.to_string(), ConfigSource::Default);
        }

        let src = ConfigSource::Config;

        if let Some(g) = file.generation {
            apply!(attr, src, "generation.preference", generation.preference, g.preference);
            if g.pinned_backend.is_some() {
                generation.pinned_backend = g.pinned_backend;
                attr.insert("generation.pinned_backend".to_string(), src.clone());
            }
            apply!(attr, src, "generation.fallback_enabled", generation.fallback_enabled, g.fallback_enabled);
            apply!(attr, src, "generation.concurrency_limit", generation.concurrency_limit, g.concurrency_limit);
            apply!(attr, src, "generation.max_tokens", generation.max_tokens, g.max_tokens);
            apply!(attr, src, "generation.temperature", generation.temperature, g.temperature);
            apply!(attr, src, "generation.truncation_retries", generation.truncation_retries, g.truncation_retries);
            apply!(attr, src, "generation.call_timeout_secs", generation.call_timeout_secs, g.call_timeout_secs);
            apply!(attr, src, "generation.batches", generation.batches, g.batches);
        }

        if let Some(r) = file.research {
            apply!(attr, src, "research.concurrency_limit", research.concurrency_limit, r.concurrency_limit);
            apply!(attr, src, "research.max_tokens", research.max_tokens, r.max_tokens);
            apply!(attr, src, "research.temperature", research.temperature, r.temperature);
            apply!(attr, src, "research.call_timeout_secs", research.call_timeout_secs, r.call_timeout_secs);
        }

        if let Some(p) = file.privacy {
            apply!(attr, src, "privacy.strictness", privacy.strictness, p.strictness);
            apply!(attr, src, "privacy.confidence_threshold", privacy.confidence_threshold, p.confidence_threshold);
            apply!(attr, src, "privacy.scan_timeout_secs", privacy.scan_timeout_secs, p.scan_timeout_secs);
        }

        if let Some(p) = file.providers {
            if let Some(r) = p.remote {
                let remote = &mut providers.remote;
                apply!(attr, src, "providers.remote.model", remote.model, r.model);
                apply!(attr, src, "providers.remote.base_url", remote.base_url, r.base_url);
                apply!(attr, src, "providers.remote.api_key_env", remote.api_key_env, r.api_key_env);
                apply!(attr, src, "providers.remote.web_search", remote.web_search, r.web_search);
                apply!(attr, src, "providers.remote.max_searches", remote.max_searches, r.max_searches);
                apply!(attr, src, "providers.remote.health_timeout_secs", remote.health_timeout_secs, r.health_timeout_secs);
            }
            if let Some(l) = p.local {
                let local = &mut providers.local;
                apply!(attr, src, "providers.local.base_url", local.base_url, l.base_url);
                apply!(attr, src, "providers.local.model", local.model, l.model);
                if l.api_key_env.is_some() {
                    local.api_key_env = l.api_key_env;
                    attr.insert("providers.local.api_key_env".to_string(), src.clone());
                }
                apply!(attr, src, "providers.local.health_timeout_secs", local.health_timeout_secs, l.health_timeout_secs);
            }
        }

        if let Some(o) = file.output {
            apply!(attr, src, "output.destinations", output.destinations, o.destinations);
            apply!(attr, src, "output.output_dir", output.output_dir, o.output_dir);
            if o.vault_path.is_some() {
                output.vault_path = o.vault_path;
                attr.insert("output.vault_path".to_string(), src.clone());
            }
            if o.git_path.is_some() {
                output.git_path = o.git_path;
                attr.insert("output.git_path".to_string(), src.clone());
            }
            if o.wiki.is_some() {
                output.wiki = o.wiki;
                attr.insert("output.wiki".to_string(), src.clone());
            }
        }

        if let Some(a) = file.audit {
            if a.path.is_some() {
                attr.insert("audit.path".to_string(), src.clone());
            }
            audit = a;
        }

        // CLI overrides (highest priority)
        let cli_src = ConfigSource::Cli;
        apply!(attr, cli_src, "generation.preference", generation.preference, cli.preference);
        if cli.pinned_backend.is_some() {
            generation.pinned_backend = cli.pinned_backend;
            attr.insert("generation.pinned_backend".to_string(), cli_src.clone());
        }
        apply!(attr, cli_src, "generation.fallback_enabled", generation.fallback_enabled, cli.fallback_enabled);
        apply!(attr, cli_src, "generation.concurrency_limit", generation.concurrency_limit, cli.generation_concurrency);
        apply!(attr, cli_src, "privacy.strictness", privacy.strictness, cli.strictness);
        apply!(attr, cli_src, "output.output_dir", output.output_dir, cli.output_dir.clone());

        Self {
            generation,
            research,
            privacy,
            providers,
            output,
            audit,
            source_attribution: attr,
        }
    }

    /// Locate a config file without an explicit path.
    ///
    /// `$CHARTER_HOME/config.toml` wins, then an upward search for
    /// `.charter/config.toml` that stops at repository root markers, then
    /// the user configuration directory.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        if let Ok(home) = env::var("CHARTER_HOME")
            && !home.is_empty()
        {
            let path = PathBuf::from(home).join("config.toml");
            if path.exists() {
                return Ok(Some(path));
            }
        }

        let mut current_dir = start_dir.to_path_buf();
        loop {
            let config_path = current_dir.join(".charter").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        if let Some(user_dir) = dirs::config_dir() {
            let path = user_dir.join("charter").join("config.toml");
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {}", path.display(), e.message()))
        })?;
        Ok(config)
    }
}
