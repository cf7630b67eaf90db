//! `charter run`: create a run, take the approval decision and follow it to
//! a terminal phase.

use anyhow::{Context, Result};
use serde_json::json;
use std::io::{BufRead, Write};
use std::time::Duration;

use charter_config::{Config, RunOverrides};
use charter_orchestrator::{PipelineOrchestrator, RunResult, RunStatus};
use charter_privacy::ApprovalDecision;
use charter_utils::exit_codes::ExitCode;
use charter_utils::types::{ProjectPhase, RunId};

use super::common::{print_discovery, print_json, project_input};
use crate::cli::args::RunArgs;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn execute_run_command(args: &RunArgs, config: Config) -> Result<ExitCode> {
    let orchestrator = PipelineOrchestrator::new(config)?;
    let run_id = orchestrator
        .create_run(project_input(&args.project), run_overrides(args))
        .await?;

    if orchestrator.wait(&run_id).await? != ProjectPhase::AwaitingApproval {
        let status = orchestrator.get_status(&run_id)?;
        eprintln!(
            "✗ Run {run_id} failed before approval: {}",
            status.error_detail.as_deref().unwrap_or("unknown error")
        );
        return Ok(ExitCode::PRIVACY_BLOCKED);
    }

    let discovery = orchestrator.get_discovery(&run_id)?;
    if !args.json {
        print_discovery(&run_id, &discovery);
    }

    let answer = if args.yes {
        if args.sanitized {
            ApprovalAnswer::Sanitized
        } else {
            ApprovalAnswer::Original
        }
    } else {
        prompt_answer(args.sanitized || !discovery.blocking.is_empty()).await?
    };
    let decision = answer.decision(&discovery.blocking);
    let approved = decision.approved;
    orchestrator.approve(&run_id, decision).await?;

    if !approved {
        println!("Approval denied; no provider was called.");
        return Ok(ExitCode::PRIVACY_BLOCKED);
    }

    let status = follow_progress(&orchestrator, &run_id, args.json).await?;
    let result = orchestrator.get_result(&run_id)?;
    if args.json {
        print_json(&summary_json(&status, &result))?;
    } else {
        print_summary(&status, &result);
    }

    Ok(match status.phase {
        ProjectPhase::Completed => ExitCode::SUCCESS,
        _ => ExitCode::RUN_FAILED,
    })
}

fn run_overrides(args: &RunArgs) -> RunOverrides {
    let mut overrides = match args.pinned {
        Some(backend) => RunOverrides::pinned(backend.into()),
        None => RunOverrides::default(),
    };
    if args.pinned.is_none() {
        overrides.preference = args.prefer.map(Into::into);
    }
    if args.no_fallback {
        overrides.fallback_enabled = Some(false);
    }
    overrides.generation_concurrency = args.concurrency;
    overrides
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApprovalAnswer {
    Original,
    Sanitized,
    Deny,
}

impl ApprovalAnswer {
    fn parse(answer: &str) -> Self {
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Self::Original,
            "s" | "sanitized" => Self::Sanitized,
            _ => Self::Deny,
        }
    }

    /// Approving the original text keeps every blocking finding explicitly,
    /// since the gate refuses unacknowledged blocking findings.
    fn decision(self, blocking: &[usize]) -> ApprovalDecision {
        match self {
            Self::Original => ApprovalDecision::approve_keeping(blocking.iter().copied()),
            Self::Sanitized => ApprovalDecision::approve_sanitized(),
            Self::Deny => ApprovalDecision::deny(),
        }
    }
}

/// Ask on stdin. End of input counts as a denial.
async fn prompt_answer(suggest_sanitized: bool) -> Result<ApprovalAnswer> {
    let default_hint = if suggest_sanitized { " (s recommended)" } else { "" };
    print!("\nApprove sending this description to research providers? [y]es / [s]anitized / [N]o{default_hint}: ");
    std::io::stdout().flush().context("Failed to flush prompt")?;

    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await
    .context("Approval prompt task failed")?
    .context("Failed to read approval answer")?;

    Ok(ApprovalAnswer::parse(&answer))
}

/// Poll status until the run is terminal. Ctrl-C requests cancellation once.
async fn follow_progress(
    orchestrator: &PipelineOrchestrator,
    run_id: &RunId,
    quiet: bool,
) -> Result<RunStatus> {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last: Option<(ProjectPhase, usize)> = None;
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = tokio::signal::ctrl_c(), if !cancel_requested => {
                if signal.is_ok() {
                    cancel_requested = true;
                    let phase = orchestrator.cancel(run_id)?;
                    eprintln!("Cancellation requested during {phase}");
                }
            }
        }

        let status = orchestrator.get_status(run_id)?;
        let marker = (status.phase, status.documents_completed);
        if !quiet && last != Some(marker) {
            if status.phase == ProjectPhase::Generating {
                println!(
                    "  [{}] {}/{} documents",
                    status.phase, status.documents_completed, status.documents_total
                );
            } else {
                println!("  [{}]", status.phase);
            }
            last = Some(marker);
        }
        if status.phase.is_terminal() {
            return Ok(status);
        }
    }
}

fn print_summary(status: &RunStatus, result: &RunResult) {
    let succeeded = result.documents.iter().filter(|d| d.succeeded()).count();
    println!();
    match status.phase {
        ProjectPhase::Completed => println!(
            "✓ Run {} completed in {:.1}s",
            status.run_id,
            status.elapsed.as_secs_f64()
        ),
        _ => println!(
            "✗ Run {} failed: {}",
            status.run_id,
            status.error_detail.as_deref().unwrap_or("unknown error")
        ),
    }
    println!("  Documents: {succeeded} of {} succeeded", status.documents_total);
    if let Some(provider) = status.provider {
        println!("  Last provider: {provider}");
    }
    for failed in result.documents.iter().filter(|d| !d.succeeded()) {
        println!(
            "  ✗ {}: {}",
            failed.title,
            failed.error.as_deref().unwrap_or("failed")
        );
    }

    if let Some(quality) = &result.quality {
        println!(
            "  Quality: grade {} (score {:.2}, {} warnings, {} notes)",
            quality.grade,
            quality.score,
            quality.warning_count(),
            quality.info_count()
        );
    }

    for output in &result.outputs {
        match (&output.report, &output.error) {
            (Some(report), _) => println!(
                "  ✓ {}: {} documents at {}",
                output.destination, report.documents_written, report.location
            ),
            (None, Some(error)) => println!("  ✗ {}: {error}", output.destination),
            (None, None) => {}
        }
    }
}

fn summary_json(status: &RunStatus, result: &RunResult) -> serde_json::Value {
    json!({
        "run_id": status.run_id,
        "phase": status.phase,
        "elapsed_ms": status.elapsed.as_millis() as u64,
        "error_detail": status.error_detail,
        "provider": status.provider,
        "documents": result.documents.iter().map(|d| json!({
            "doc_type": d.doc_type,
            "path": d.relative_path(),
            "succeeded": d.succeeded(),
            "revision": d.revision,
            "error": d.error,
        })).collect::<Vec<_>>(),
        "quality": result.quality,
        "outputs": result.outputs,
    })
}
