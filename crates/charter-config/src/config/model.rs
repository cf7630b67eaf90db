use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use charter_utils::documents::BatchPlan;
use charter_utils::types::ProviderKind;

pub const DEFAULT_GENERATION_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_GENERATION_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TRUNCATION_RETRIES: u32 = 2;
pub const DEFAULT_GENERATION_CONCURRENCY: usize = 3;
pub const DEFAULT_RESEARCH_CONCURRENCY: usize = 2;
pub const DEFAULT_RESEARCH_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REMOTE_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_REMOTE_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_LOCAL_MODEL: &str = "local-model";
pub const DEFAULT_WIKI_KEY_ENV: &str = "OUTLINE_API_KEY";

/// How the generation backend is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    /// Health-check the local backend first.
    #[default]
    Local,
    /// Health-check the remote backend first.
    Remote,
    /// Always use `pinned_backend`, no health check.
    Pinned,
}

impl std::fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::Pinned => write!(f, "pinned"),
        }
    }
}

impl std::str::FromStr for ProviderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "pinned" => Ok(Self::Pinned),
            other => Err(format!(
                "unknown provider preference '{other}' (expected local, remote or pinned)"
            )),
        }
    }
}

/// Behaviour when the sensitivity scanner itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStrictness {
    /// Block the run.
    #[default]
    Strict,
    /// Continue with zero findings and a warning.
    Permissive,
}

impl std::fmt::Display for PrivacyStrictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

/// Output destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Filesystem,
    Vault,
    Git,
    Wiki,
}

impl DestinationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Vault => "vault",
            Self::Git => "git",
            Self::Wiki => "wiki",
        }
    }
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[generation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub preference: ProviderPreference,
    pub pinned_backend: Option<ProviderKind>,
    pub fallback_enabled: bool,
    pub concurrency_limit: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub truncation_retries: u32,
    pub call_timeout_secs: u64,
    pub batches: BatchPlan,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            preference: ProviderPreference::Local,
            pinned_backend: None,
            fallback_enabled: true,
            concurrency_limit: DEFAULT_GENERATION_CONCURRENCY,
            max_tokens: DEFAULT_GENERATION_MAX_TOKENS,
            temperature: DEFAULT_GENERATION_TEMPERATURE,
            truncation_retries: DEFAULT_TRUNCATION_RETRIES,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            batches: BatchPlan::standard(),
        }
    }
}

/// `[research]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub concurrency_limit: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub call_timeout_secs: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_RESEARCH_CONCURRENCY,
            max_tokens: DEFAULT_RESEARCH_MAX_TOKENS,
            temperature: 0.3,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

/// `[privacy]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    pub strictness: PrivacyStrictness,
    pub confidence_threshold: f64,
    pub scan_timeout_secs: u64,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            strictness: PrivacyStrictness::Strict,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
        }
    }
}

/// `[providers.remote]`: the hosted, web-search-capable backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub web_search: bool,
    pub max_searches: u32,
    pub health_timeout_secs: u64,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_REMOTE_MODEL.to_string(),
            base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            api_key_env: DEFAULT_REMOTE_KEY_ENV.to_string(),
            web_search: true,
            max_searches: 5,
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

/// `[providers.local]`: a llama.cpp server speaking the OpenAI chat API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Optional bearer token, e.g. when the server sits behind a tunnel.
    pub api_key_env: Option<String>,
    pub health_timeout_secs: u64,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            model: DEFAULT_LOCAL_MODEL.to_string(),
            api_key_env: None,
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub remote: RemoteProviderConfig,
    pub local: LocalProviderConfig,
}

/// `[output.wiki]`: Outline-compatible wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiConfig {
    pub api_url: String,
    #[serde(default = "default_wiki_key_env")]
    pub api_key_env: String,
}

fn default_wiki_key_env() -> String {
    DEFAULT_WIKI_KEY_ENV.to_string()
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub destinations: Vec<DestinationKind>,
    pub output_dir: PathBuf,
    pub vault_path: Option<PathBuf>,
    pub git_path: Option<PathBuf>,
    pub wiki: Option<WikiConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destinations: vec![DestinationKind::Filesystem],
            output_dir: PathBuf::from("output"),
            vault_path: None,
            git_path: None,
            wiki: None,
        }
    }
}

/// `[audit]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSONL file; in-memory only when unset.
    pub path: Option<PathBuf>,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// CLI arguments that feed configuration discovery.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub preference: Option<ProviderPreference>,
    pub pinned_backend: Option<ProviderKind>,
    pub fallback_enabled: Option<bool>,
    pub strictness: Option<PrivacyStrictness>,
    pub output_dir: Option<PathBuf>,
    pub generation_concurrency: Option<usize>,
}
