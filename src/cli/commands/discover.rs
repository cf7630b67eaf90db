//! `charter discover`: discovery and the privacy scan, then the run is
//! cancelled at the approval gate. No provider is called.

use anyhow::Result;
use serde_json::json;

use charter_config::{Config, RunOverrides};
use charter_orchestrator::PipelineOrchestrator;
use charter_utils::exit_codes::ExitCode;
use charter_utils::types::ProjectPhase;

use super::common::{print_discovery, print_json, project_input};
use crate::cli::args::ProjectArgs;

pub async fn execute_discover_command(
    project: &ProjectArgs,
    json: bool,
    config: Config,
) -> Result<ExitCode> {
    let orchestrator = PipelineOrchestrator::new(config)?;
    let run_id = orchestrator
        .create_run(project_input(project), RunOverrides::default())
        .await?;

    if orchestrator.wait(&run_id).await? != ProjectPhase::AwaitingApproval {
        let status = orchestrator.get_status(&run_id)?;
        eprintln!(
            "✗ Privacy scan failed: {}",
            status.error_detail.as_deref().unwrap_or("unknown error")
        );
        return Ok(ExitCode::PRIVACY_BLOCKED);
    }

    let view = orchestrator.get_discovery(&run_id)?;
    orchestrator.cancel(&run_id)?;

    if json {
        print_json(&json!({ "run_id": run_id, "discovery": view }))?;
    } else {
        print_discovery(&run_id, &view);
    }
    Ok(ExitCode::SUCCESS)
}
