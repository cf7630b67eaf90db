//! Pull-based projections of run state: status, results, listing and the
//! partial results of failed runs.

mod common;

use std::time::Duration;

use charter::{AuditAction, CharterError, DocumentType, ProjectPhase, ProviderKind, RunOverrides};
use charter_llm::test_support::{MockProvider, MockReply};
use charter_utils::error::LlmError;

use common::{Harness, clinic_input, expect_not_available, requested_title, titled_reply};

#[tokio::test]
async fn test_terminal_status_and_result_are_stable() {
    let harness = Harness::new();
    let (run_id, phase) = harness.run_to_end(RunOverrides::default()).await;
    assert_eq!(phase, ProjectPhase::Completed);

    let first = harness.orchestrator.get_status(&run_id).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = harness.orchestrator.get_status(&run_id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.documents_completed, 15);
    assert_eq!(first.documents_total, 15);
    assert!(first.error_detail.is_none());

    let result = harness.orchestrator.get_result(&run_id).unwrap();
    assert_eq!(result, harness.orchestrator.get_result(&run_id).unwrap());
    assert_eq!(result.documents.len(), 15);
    assert!(result.quality.is_some());
    assert_eq!(result.outputs.len(), 1);
}

#[tokio::test]
async fn test_phase_timestamps_follow_the_happy_path() {
    let harness = Harness::new();
    let (run_id, _) = harness.run_to_end(RunOverrides::default()).await;

    let status = harness.orchestrator.get_status(&run_id).unwrap();
    let phases: Vec<ProjectPhase> = status.phase_timestamps.iter().map(|(p, _)| *p).collect();
    assert_eq!(
        phases,
        vec![
            ProjectPhase::AgentDiscovery,
            ProjectPhase::PrivacyReview,
            ProjectPhase::AwaitingApproval,
            ProjectPhase::Researching,
            ProjectPhase::Generating,
            ProjectPhase::QualityCheck,
            ProjectPhase::Outputting,
            ProjectPhase::Completed,
        ]
    );
    for pair in status.phase_timestamps.windows(2) {
        assert!(pair[0].1 <= pair[1].1, "{:?} after {:?}", pair[0], pair[1]);
    }
    assert_eq!(status.provider, Some(ProviderKind::Local));
}

#[tokio::test]
async fn test_result_is_not_available_while_generating() {
    let local = MockProvider::new()
        .with_responder(|prompt: &str| titled_reply(prompt).after(Duration::from_millis(200)));
    let harness = Harness::builder().local(local).build();
    let run_id = harness.create(RunOverrides::default()).await;

    expect_not_available(harness.orchestrator.get_result(&run_id).unwrap_err());

    harness
        .orchestrator
        .approve(&run_id, charter::ApprovalDecision::approve_original())
        .await
        .unwrap();
    let phase = harness
        .wait_for_phase(&run_id, ProjectPhase::Generating)
        .await;
    assert_eq!(phase, ProjectPhase::Generating);

    let status = harness.orchestrator.get_status(&run_id).unwrap();
    assert!(status.documents_completed < 15);
    expect_not_available(harness.orchestrator.get_result(&run_id).unwrap_err());

    harness.orchestrator.cancel(&run_id).unwrap();
    assert_eq!(
        harness.orchestrator.wait(&run_id).await.unwrap(),
        ProjectPhase::Failed
    );
}

#[tokio::test]
async fn test_failed_run_keeps_earlier_batches() {
    let local = MockProvider::new().with_responder(|prompt: &str| {
        match requested_title(prompt).as_str() {
            "Context and Background" | "Stakeholder Notes" => {
                MockReply::err(LlmError::ProviderRejected("content filter".to_string()))
            }
            _ => titled_reply(prompt),
        }
    });
    let harness = Harness::builder().local(local).build();
    let (run_id, phase) = harness
        .run_to_end(RunOverrides::pinned(ProviderKind::Local))
        .await;
    assert_eq!(phase, ProjectPhase::Failed);

    let status = harness.orchestrator.get_status(&run_id).unwrap();
    let detail = status.error_detail.unwrap();
    assert!(detail.starts_with("generating: "), "{detail}");
    assert_eq!(status.documents_completed, 5);

    let result = harness.orchestrator.get_result(&run_id).unwrap();
    let succeeded: Vec<DocumentType> = result
        .documents
        .iter()
        .filter(|d| d.succeeded())
        .map(|d| d.doc_type)
        .collect();
    assert_eq!(
        succeeded,
        vec![DocumentType::Readme, DocumentType::ProjectBrief, DocumentType::Glossary]
    );
    let failed: Vec<DocumentType> = result
        .documents
        .iter()
        .filter(|d| !d.succeeded())
        .map(|d| d.doc_type)
        .collect();
    assert_eq!(
        failed,
        vec![DocumentType::ContextBackground, DocumentType::StakeholderNotes]
    );
    assert!(result.outputs.is_empty());
    assert!(harness.destination.writes.lock().unwrap().is_empty());

    let audit = harness.orchestrator.audit().entries_for(&run_id);
    assert!(audit.iter().any(|e| e.action == AuditAction::Error && !e.success));
    assert!(!audit.iter().any(|e| e.action == AuditAction::OutputWritten));
}

#[tokio::test]
async fn test_list_runs_reports_every_run_oldest_first() {
    let harness = Harness::new();
    let first = harness.create(RunOverrides::default()).await;
    let second = harness
        .orchestrator
        .create_run(
            charter::ProjectInput::new("Food Bank", "Volunteer scheduling for a county food bank"),
            RunOverrides::default(),
        )
        .await
        .unwrap();

    let runs = harness.orchestrator.list_runs();
    let ids: Vec<_> = runs.iter().map(|r| r.run_id.clone()).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(runs[0].name, clinic_input().name);
    assert_eq!(runs[1].name, "Food Bank");
    assert!(runs.iter().all(|r| r.phase == ProjectPhase::AwaitingApproval));
    assert!(runs[0].created_at <= runs[1].created_at);
}

#[tokio::test]
async fn test_projections_for_unknown_run() {
    let harness = Harness::new();
    let run_id = harness.create(RunOverrides::default()).await;
    let unknown = charter::RunId::from_string("run-does-not-exist");
    assert_ne!(run_id, unknown);

    match harness.orchestrator.get_status(&unknown).unwrap_err() {
        CharterError::RunNotFound { .. } => {}
        other => panic!("Expected RunNotFound, got {other:?}"),
    }
    match harness.orchestrator.get_result(&unknown).unwrap_err() {
        CharterError::RunNotFound { .. } => {}
        other => panic!("Expected RunNotFound, got {other:?}"),
    }
}
