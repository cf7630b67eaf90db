//! Helpers shared by the command modules.

use anyhow::{Context, Result};
use serde::Serialize;

use charter_orchestrator::DiscoveryView;
use charter_utils::types::{ProjectInput, RunId};

use crate::cli::args::ProjectArgs;

pub fn project_input(args: &ProjectArgs) -> ProjectInput {
    ProjectInput {
        name: args.name.clone(),
        description: args.description.clone(),
        additional_context: args.context.clone(),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{json}");
    Ok(())
}

/// Human-readable discovery summary.
pub fn print_discovery(run_id: &RunId, view: &DiscoveryView) {
    println!("Run {run_id}");
    println!("\nResearch agents ({}):", view.agents.len());
    for agent in &view.agents {
        if agent.depends_on.is_empty() {
            println!("  • {} ({})", agent.name, agent.id);
        } else {
            println!(
                "  • {} ({}) after {}",
                agent.name,
                agent.id,
                agent.depends_on.join(", ")
            );
        }
    }

    if view.scan_degraded {
        println!("\n⚠ The privacy scanner was unavailable; no findings were produced.");
    }
    if view.privacy_findings.is_empty() {
        println!("\nPrivacy findings: none");
        return;
    }

    println!("\nPrivacy findings ({}):", view.privacy_findings.len());
    for (index, finding) in view.privacy_findings.iter().enumerate() {
        let marker = if view.blocking.contains(&index) { "✗" } else { "•" };
        println!(
            "  {marker} [{index}] {} \"{}\" (confidence {:.2})",
            finding.category, finding.text, finding.confidence
        );
    }
    if !view.blocking.is_empty() {
        println!(
            "\n{} finding(s) marked ✗ must be sanitized or overridden before approval.",
            view.blocking.len()
        );
    }
}
