//! Generation backend selection through whole runs: failover when the
//! preferred backend is unhealthy, hard failure without fallback, pinning,
//! and isolation between concurrent runs with different settings.

mod common;

use charter::{ProjectPhase, ProviderKind, RunOverrides};
use charter_llm::test_support::MockProvider;

use common::{Harness, titled_reply};

fn no_fallback() -> RunOverrides {
    RunOverrides {
        fallback_enabled: Some(false),
        ..RunOverrides::default()
    }
}

fn with_fallback() -> RunOverrides {
    RunOverrides {
        fallback_enabled: Some(true),
        ..RunOverrides::default()
    }
}

#[tokio::test]
async fn test_unhealthy_local_fails_over_for_every_call() {
    let h = Harness::builder()
        .local(MockProvider::new().healthy(false).with_responder(titled_reply))
        .build();

    let (run_id, phase) = h.run_to_end(with_fallback()).await;
    assert_eq!(phase, ProjectPhase::Completed);

    assert_eq!(h.local.call_count(), 0);
    assert_eq!(h.remote.call_count(), 15);
    let result = h.orchestrator.get_result(&run_id).unwrap();
    assert!(
        result
            .documents
            .iter()
            .all(|d| d.provider == Some(ProviderKind::Remote))
    );
    assert_eq!(
        h.orchestrator.get_status(&run_id).unwrap().provider,
        Some(ProviderKind::Remote)
    );
}

#[tokio::test]
async fn test_no_fallback_fails_phase_without_attempts() {
    let h = Harness::builder()
        .local(MockProvider::new().healthy(false).with_responder(titled_reply))
        .build();

    let (run_id, phase) = h.run_to_end(no_fallback()).await;
    assert_eq!(phase, ProjectPhase::Failed);
    assert_eq!(h.generation_calls(), 0);

    let status = h.orchestrator.get_status(&run_id).unwrap();
    let detail = status.error_detail.unwrap();
    assert!(detail.starts_with("generating: "), "{detail}");
    assert!(detail.contains("No provider available"), "{detail}");
    assert_eq!(status.provider, None);
    assert!(h.orchestrator.get_result(&run_id).unwrap().documents.is_empty());
}

#[tokio::test]
async fn test_healthy_local_serves_every_call() {
    let h = Harness::new();
    let (_, phase) = h.run_to_end(RunOverrides::default()).await;

    assert_eq!(phase, ProjectPhase::Completed);
    assert_eq!(h.local.call_count(), 15);
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_pinned_backend_skips_health_checks() {
    let h = Harness::new();
    let (run_id, phase) = h.run_to_end(RunOverrides::pinned(ProviderKind::Remote)).await;

    assert_eq!(phase, ProjectPhase::Completed);
    assert_eq!(h.local.health_check_count(), 0);
    assert_eq!(h.remote.health_check_count(), 0);
    assert_eq!(h.local.call_count(), 0);
    assert_eq!(
        h.orchestrator.get_status(&run_id).unwrap().provider,
        Some(ProviderKind::Remote)
    );
}

#[tokio::test]
async fn test_concurrent_runs_keep_their_own_backend_choice() {
    let h = Harness::new();
    let (pinned_local, pinned_remote) = tokio::join!(
        h.run_to_end(RunOverrides::pinned(ProviderKind::Local)),
        h.run_to_end(RunOverrides::pinned(ProviderKind::Remote)),
    );

    assert_eq!(pinned_local.1, ProjectPhase::Completed);
    assert_eq!(pinned_remote.1, ProjectPhase::Completed);

    let local_docs = h.orchestrator.get_result(&pinned_local.0).unwrap().documents;
    let remote_docs = h.orchestrator.get_result(&pinned_remote.0).unwrap().documents;
    assert!(local_docs.iter().all(|d| d.provider == Some(ProviderKind::Local)));
    assert!(remote_docs.iter().all(|d| d.provider == Some(ProviderKind::Remote)));
    assert_eq!(h.local.call_count(), 15);
    assert_eq!(h.remote.call_count(), 15);
}

#[tokio::test]
async fn test_research_never_uses_generation_backends() {
    let h = Harness::new();
    let (_, phase) = h.run_to_end(RunOverrides::default()).await;

    assert_eq!(phase, ProjectPhase::Completed);
    assert!(h.research.call_count() > 0);
    assert!(
        h.local
            .prompts()
            .iter()
            .all(|p| common::is_generation_prompt(p))
    );
}
