//! Shared harness for the integration tests.
//!
//! Builds a [`PipelineOrchestrator`] over scripted providers, an injectable
//! scanner and an in-memory output destination.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use charter::{
    ApprovalDecision, AuditLog, CharterError, Components, Config, DestinationReport,
    GeneratedDocument, OutputDestination, OutputRun, PipelineOrchestrator, ProjectInput,
    ProjectPhase, ProviderSelector, RunId, RunOverrides, SensitivityScanner,
};
use charter_config::DestinationKind;
use charter_llm::test_support::{MockProvider, MockReply};
use charter_privacy::test_support::StaticScanner;
use charter_utils::error::OutputError;

/// Title a generation prompt asks for, or "" for research prompts.
pub fn requested_title(prompt: &str) -> String {
    prompt
        .split("## DOCUMENT TO WRITE\n")
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .unwrap_or_default()
        .to_string()
}

/// A complete document body carrying a per-title marker line.
pub fn titled_reply(prompt: &str) -> MockReply {
    let title = requested_title(prompt);
    if title.is_empty() {
        return MockReply::ok("### Key Findings\n- Intake forms must meet accessibility rules.\n");
    }
    MockReply::ok(format!("# {title}\n\n## Overview\n\nMarker for {title}.\n"))
}

pub fn is_generation_prompt(prompt: &str) -> bool {
    !requested_title(prompt).is_empty()
}

/// Keeps what it was handed in memory.
#[derive(Default)]
pub struct MemoryDestination {
    pub writes: Mutex<Vec<Vec<Arc<GeneratedDocument>>>>,
}

#[async_trait]
impl OutputDestination for MemoryDestination {
    fn kind(&self) -> DestinationKind {
        DestinationKind::Filesystem
    }

    async fn write(
        &self,
        _run: &OutputRun,
        documents: &[Arc<GeneratedDocument>],
    ) -> Result<DestinationReport, OutputError> {
        let written: Vec<_> = documents.iter().filter(|d| d.succeeded()).cloned().collect();
        let count = written.len();
        self.writes.lock().unwrap().push(written);
        Ok(DestinationReport {
            destination: DestinationKind::Filesystem,
            documents_written: count,
            location: "memory".to_string(),
        })
    }
}

pub struct Harness {
    pub orchestrator: PipelineOrchestrator,
    pub local: Arc<MockProvider>,
    pub remote: Arc<MockProvider>,
    pub research: Arc<MockProvider>,
    pub destination: Arc<MemoryDestination>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Generation calls seen by both generation backends.
    pub fn generation_calls(&self) -> usize {
        self.local.call_count() + self.remote.call_count()
    }

    pub fn total_calls(&self) -> usize {
        self.generation_calls() + self.research.call_count()
    }

    pub async fn create(&self, overrides: RunOverrides) -> RunId {
        self.orchestrator
            .create_run(clinic_input(), overrides)
            .await
            .unwrap()
    }

    /// Create, approve as submitted and wait for a terminal phase.
    pub async fn run_to_end(&self, overrides: RunOverrides) -> (RunId, ProjectPhase) {
        let run_id = self.create(overrides).await;
        self.orchestrator
            .approve(&run_id, ApprovalDecision::approve_original())
            .await
            .unwrap();
        let phase = self.orchestrator.wait(&run_id).await.unwrap();
        (run_id, phase)
    }

    /// Poll until `phase` is reached or the run settles.
    pub async fn wait_for_phase(&self, run_id: &RunId, phase: ProjectPhase) -> ProjectPhase {
        for _ in 0..2_000 {
            let current = self.orchestrator.get_status(run_id).unwrap().phase;
            if current == phase || current.is_terminal() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("run {run_id} never reached {phase}");
    }
}

pub struct HarnessBuilder {
    local: MockProvider,
    remote: MockProvider,
    research: MockProvider,
    scanner: Arc<dyn SensitivityScanner>,
    config: Config,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            local: MockProvider::new().with_responder(titled_reply),
            remote: MockProvider::new().with_responder(titled_reply),
            research: MockProvider::new().with_web_search().with_responder(titled_reply),
            scanner: Arc::new(StaticScanner(Vec::new())),
            config: Config::default(),
        }
    }
}

impl HarnessBuilder {
    pub fn local(mut self, local: MockProvider) -> Self {
        self.local = local;
        self
    }

    pub fn remote(mut self, remote: MockProvider) -> Self {
        self.remote = remote;
        self
    }

    pub fn research(mut self, research: MockProvider) -> Self {
        self.research = research;
        self
    }

    pub fn scanner(mut self, scanner: Arc<dyn SensitivityScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let local = Arc::new(self.local);
        let remote = Arc::new(self.remote);
        let research = Arc::new(self.research);
        let destination = Arc::new(MemoryDestination::default());
        let selector = ProviderSelector::new(local.clone(), remote.clone())
            .with_research_client(research.clone());
        let orchestrator = PipelineOrchestrator::with_components(
            self.config,
            Components {
                selector: Arc::new(selector),
                scanner: self.scanner,
                destinations: vec![destination.clone()],
                audit: AuditLog::in_memory(),
            },
        );
        Harness {
            orchestrator,
            local,
            remote,
            research,
            destination,
        }
    }
}

pub fn clinic_input() -> ProjectInput {
    ProjectInput::new(
        "Clinic Intake",
        "A patient intake web app for a rural health clinic",
    )
}

pub fn expect_not_available(err: CharterError) {
    match err {
        CharterError::NotAvailable { .. } => {}
        other => panic!("Expected NotAvailable, got {other:?}"),
    }
}
