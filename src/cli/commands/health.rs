//! `charter health`: probe both generation backends and report what the
//! selector would choose with the configured preference.

use anyhow::Result;
use serde::Serialize;

use charter_config::{Config, RunOverrides, RunSettings};
use charter_llm::{HealthReport, ProviderSelector};
use charter_utils::error::CharterError;
use charter_utils::exit_codes::ExitCode;
use charter_utils::types::ProviderKind;

use super::common::print_json;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthOutput {
    local: bool,
    remote: bool,
    preference: String,
    fallback_enabled: bool,
    /// `None` when no backend would be selected.
    would_select: Option<ProviderKind>,
}

pub async fn execute_health_command(json: bool, config: Config) -> Result<ExitCode> {
    let settings = config
        .run_settings(&RunOverrides::default())
        .map_err(CharterError::from)?;
    let selector = ProviderSelector::from_config(&config).map_err(CharterError::from)?;
    let report = selector.health_report().await;
    let output = HealthOutput {
        local: report.local,
        remote: report.remote,
        preference: settings.preference.to_string(),
        fallback_enabled: settings.fallback_enabled,
        would_select: would_select(&settings, report),
    };

    if json {
        print_json(&output)?;
    } else {
        let mark = |healthy: bool| if healthy { "✓ healthy" } else { "✗ unreachable" };
        println!("Local backend:  {}", mark(output.local));
        println!("Remote backend: {}", mark(output.remote));
        println!(
            "Preference: {} (fallback {})",
            output.preference,
            if output.fallback_enabled { "on" } else { "off" }
        );
        match output.would_select {
            Some(kind) => println!("Generation would use: {kind}"),
            None => println!("Generation would fail: no backend available"),
        }
    }

    Ok(if output.would_select.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::PROVIDER_FAILURE
    })
}

/// Mirrors generation selection: pinned wins, then the preferred backend if
/// healthy, then the other one when fallback is allowed.
fn would_select(settings: &RunSettings, report: HealthReport) -> Option<ProviderKind> {
    if let Some(pinned) = settings.pinned_backend
        && settings.preferred_backend().is_none()
    {
        return Some(pinned);
    }
    let preferred = settings.preferred_backend().unwrap_or(ProviderKind::Local);
    let healthy = |kind: ProviderKind| match kind {
        ProviderKind::Local => report.local,
        ProviderKind::Remote => report.remote,
    };
    if healthy(preferred) {
        Some(preferred)
    } else if settings.fallback_enabled {
        Some(preferred.other())
    } else {
        None
    }
}
