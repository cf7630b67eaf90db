//! Configuration for charter.
//!
//! Precedence is CLI > config file > built-in defaults. Per-run overrides are
//! resolved into [`RunSettings`] and threaded through each run explicitly.

pub mod config;

pub use config::{
    AuditConfig, CliArgs, Config, ConfigBuilder, ConfigSource, DestinationKind, GenerationConfig,
    LocalProviderConfig, OutputConfig, PrivacyConfig, PrivacyStrictness, ProviderPreference,
    ProvidersConfig, RemoteProviderConfig, ResearchConfig, RunOverrides, RunSettings, WikiConfig,
};
