//! `charter config`: print the effective configuration with the source of
//! each value.

use anyhow::Result;

use charter_config::{Config, ConfigSource};
use charter_utils::exit_codes::ExitCode;

pub fn execute_config_command(config: &Config) -> Result<ExitCode> {
    for (key, value) in effective_values(config) {
        let source = config
            .source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default);
        println!("{key:<34} = {value:<40} ({source})");
    }
    Ok(ExitCode::SUCCESS)
}

fn effective_values(config: &Config) -> Vec<(&'static str, String)> {
    let g = &config.generation;
    let r = &config.research;
    let p = &config.privacy;
    let o = &config.output;
    let optional = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    vec![
        ("generation.preference", g.preference.to_string()),
        ("generation.pinned_backend", optional(g.pinned_backend.map(|k| k.to_string()))),
        ("generation.fallback_enabled", g.fallback_enabled.to_string()),
        ("generation.concurrency_limit", g.concurrency_limit.to_string()),
        ("generation.max_tokens", g.max_tokens.to_string()),
        ("generation.temperature", g.temperature.to_string()),
        ("generation.truncation_retries", g.truncation_retries.to_string()),
        ("generation.call_timeout_secs", g.call_timeout_secs.to_string()),
        ("generation.batches", format!("{} batches", g.batches.batches().len())),
        ("research.concurrency_limit", r.concurrency_limit.to_string()),
        ("research.max_tokens", r.max_tokens.to_string()),
        ("research.temperature", r.temperature.to_string()),
        ("research.call_timeout_secs", r.call_timeout_secs.to_string()),
        ("privacy.strictness", p.strictness.to_string()),
        ("privacy.confidence_threshold", p.confidence_threshold.to_string()),
        ("privacy.scan_timeout_secs", p.scan_timeout_secs.to_string()),
        ("providers.remote.model", config.providers.remote.model.clone()),
        ("providers.remote.base_url", config.providers.remote.base_url.clone()),
        ("providers.remote.web_search", config.providers.remote.web_search.to_string()),
        ("providers.local.base_url", config.providers.local.base_url.clone()),
        ("providers.local.model", config.providers.local.model.clone()),
        (
            "output.destinations",
            o.destinations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        ("output.output_dir", o.output_dir.display().to_string()),
        (
            "audit.path",
            optional(config.audit.path.as_ref().map(|p| p.display().to_string())),
        ),
    ]
}
