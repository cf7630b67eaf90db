//! Configuration management for charter
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. The TOML file supports `[generation]`, `[research]`,
//! `[privacy]`, `[providers.remote]`, `[providers.local]`, `[output]` and
//! `[audit]` sections.

mod builder;
mod discovery;
mod model;
mod settings;
mod sources;
mod validation;

use std::collections::HashMap;

pub use builder::ConfigBuilder;
pub use model::*;
pub use settings::{RunOverrides, RunSettings};

/// Configuration for charter.
///
/// # Discovery
///
/// [`Config::discover()`] looks for a configuration file in this order:
/// - the explicit `--config` path
/// - `$CHARTER_HOME/config.toml`
/// - `.charter/config.toml` in the start directory or any parent, stopping at
///   a repository root
/// - `charter/config.toml` in the user configuration directory
///
/// # Source Attribution
///
/// Each value tracks whether it came from the CLI, the file, the builder, or
/// the built-in default. `charter config` prints this table.
///
/// ```rust,no_run
/// use charter_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("fallback: {}", config.generation.fallback_enabled);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub research: ResearchConfig,
    pub privacy: PrivacyConfig,
    pub providers: ProvidersConfig,
    pub output: OutputConfig,
    pub audit: AuditConfig,
    pub source_attribution: HashMap<String, ConfigSource>,
}
