use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use charter_config::RunSettings;
use charter_generator::DocumentLedger;
use charter_output::DestinationReport;
use charter_privacy::ScanSnapshot;
use charter_quality::QualityReport;
use charter_research::ResearchBrief;
use charter_utils::documents::GeneratedDocument;
use charter_utils::error::PhaseError;
use charter_utils::types::{
    AgentDefinition, PrivacyFinding, ProjectInput, ProjectPhase, ProviderKind, RunId,
};

use crate::state::RunState;

/// Outcome of one output destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DestinationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputRecord {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Discovered agents and the privacy scan, shown before approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryView {
    pub agents: Vec<AgentDefinition>,
    pub privacy_findings: Vec<PrivacyFinding>,
    /// Indices into `privacy_findings` that need an override or sanitizing.
    pub blocking: Vec<usize>,
    /// The scanner was unavailable and permissive mode continued without it.
    pub scan_degraded: bool,
}

impl DiscoveryView {
    pub(crate) fn new(agents: Vec<AgentDefinition>, snapshot: ScanSnapshot) -> Self {
        Self {
            agents,
            privacy_findings: snapshot.findings,
            blocking: snapshot.blocking,
            scan_degraded: snapshot.degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub run_id: RunId,
    pub name: String,
    pub phase: ProjectPhase,
    pub elapsed: Duration,
    pub documents_completed: usize,
    pub documents_total: usize,
    pub error_detail: Option<String>,
    pub phase_timestamps: Vec<(ProjectPhase, DateTime<Utc>)>,
    pub provider: Option<ProviderKind>,
}

/// Documents, quality and outputs of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub run_id: RunId,
    pub phase: ProjectPhase,
    pub documents: Vec<Arc<GeneratedDocument>>,
    pub quality: Option<QualityReport>,
    pub outputs: Vec<OutputRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub name: String,
    pub phase: ProjectPhase,
    pub created_at: DateTime<Utc>,
}

/// Everything the orchestrator holds for one run.
///
/// Lifecycle state sits behind its own mutex; phase outputs are written once
/// by the pipeline task and read by projections.
pub(crate) struct RunSlot {
    pub run_id: RunId,
    pub sequence: u64,
    pub input: ProjectInput,
    pub settings: RunSettings,
    pub cancel: AtomicBool,
    pub ledger: DocumentLedger,
    state: Mutex<RunState>,
    phase_tx: watch::Sender<ProjectPhase>,
    agents: Mutex<Vec<AgentDefinition>>,
    brief: Mutex<Option<Arc<ResearchBrief>>>,
    quality: Mutex<Option<QualityReport>>,
    outputs: Mutex<Vec<OutputRecord>>,
    /// Serializes regeneration requests for this run.
    pub regeneration: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunSlot {
    pub fn new(run_id: RunId, sequence: u64, input: ProjectInput, settings: RunSettings) -> Self {
        let state = RunState::new(Utc::now());
        let (phase_tx, _) = watch::channel(state.phase);
        Self {
            run_id,
            sequence,
            input,
            settings,
            cancel: AtomicBool::new(false),
            ledger: DocumentLedger::new(),
            state: Mutex::new(state),
            phase_tx,
            agents: Mutex::default(),
            brief: Mutex::default(),
            quality: Mutex::default(),
            outputs: Mutex::default(),
            regeneration: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> RunState {
        lock(&self.state).clone()
    }

    pub fn phase(&self) -> ProjectPhase {
        lock(&self.state).phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run `f` with the state locked, publishing the phase afterwards.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RunState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = f(&mut state);
        self.phase_tx.send_replace(state.phase);
        result
    }

    pub fn transition(&self, to: ProjectPhase) -> Result<(), PhaseError> {
        self.with_state(|s| s.transition(to))
    }

    /// Fail the run unless it is already terminal. Returns whether it failed.
    pub fn fail(&self, detail: impl Into<String>) -> bool {
        self.with_state(|s| s.fail(detail).is_ok())
    }

    pub fn subscribe(&self) -> watch::Receiver<ProjectPhase> {
        self.phase_tx.subscribe()
    }

    pub fn set_agents(&self, agents: Vec<AgentDefinition>) {
        *lock(&self.agents) = agents;
    }

    pub fn agents(&self) -> Vec<AgentDefinition> {
        lock(&self.agents).clone()
    }

    pub fn set_brief(&self, brief: Arc<ResearchBrief>) {
        *lock(&self.brief) = Some(brief);
    }

    pub fn brief(&self) -> Option<Arc<ResearchBrief>> {
        lock(&self.brief).clone()
    }

    pub fn set_quality(&self, report: QualityReport) {
        *lock(&self.quality) = Some(report);
    }

    pub fn quality(&self) -> Option<QualityReport> {
        lock(&self.quality).clone()
    }

    pub fn push_output(&self, record: OutputRecord) {
        lock(&self.outputs).push(record);
    }

    pub fn outputs(&self) -> Vec<OutputRecord> {
        lock(&self.outputs).clone()
    }

    pub fn status(&self) -> RunStatus {
        let state = self.state();
        RunStatus {
            run_id: self.run_id.clone(),
            name: self.input.name.clone(),
            phase: state.phase,
            elapsed: state.elapsed_at(Utc::now()),
            documents_completed: self.ledger.settled(),
            documents_total: self.ledger.total(),
            error_detail: state.error_detail.clone(),
            phase_timestamps: state.phase_timestamps.into_iter().collect(),
            provider: state.provider,
        }
    }

    pub fn summary(&self) -> RunSummary {
        let state = self.state();
        RunSummary {
            run_id: self.run_id.clone(),
            name: self.input.name.clone(),
            phase: state.phase,
            created_at: state.created_at,
        }
    }
}
