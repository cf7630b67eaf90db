use camino::Utf8PathBuf;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{Instrument, info, warn};

use charter_config::{Config, RunOverrides};
use charter_discovery::discover;
use charter_generator::{DocumentBatchGenerator, GenerationInput};
use charter_llm::{HealthReport, ProviderSelector};
use charter_output::{OutputDestination, OutputRun, destinations_from_config};
use charter_privacy::{ApprovalDecision, PrivacyGate, RegexScanner, SensitivityScanner};
use charter_quality::QualityValidator;
use charter_research::{AgentFindings, ResearchBrief, ResearchCoordinator};
use charter_utils::documents::{DocumentType, GeneratedDocument};
use charter_utils::error::{CharterError, ConfigError, GateError, OutputError, PhaseError};
use charter_utils::logging::{log_phase_complete, log_phase_error, log_phase_start, phase_span};
use charter_utils::types::{ProjectInput, ProjectPhase, RunId};

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::run::{DiscoveryView, OutputRecord, RunResult, RunSlot, RunStatus, RunSummary};

pub(crate) const DENIED_DETAIL: &str = "Privacy approval denied by user";

/// Collaborators injected into the orchestrator.
pub struct Components {
    pub selector: Arc<ProviderSelector>,
    pub scanner: Arc<dyn SensitivityScanner>,
    pub destinations: Vec<Arc<dyn OutputDestination>>,
    pub audit: AuditLog,
}

struct Inner {
    config: Arc<Config>,
    selector: Arc<ProviderSelector>,
    gate: PrivacyGate,
    research: ResearchCoordinator,
    generator: DocumentBatchGenerator,
    destinations: Vec<Result<Arc<dyn OutputDestination>, OutputError>>,
    audit: AuditLog,
    runs: RwLock<HashMap<RunId, Arc<RunSlot>>>,
    sequence: AtomicU64,
}

/// Facade over every run in the process.
///
/// Runs are independent task trees. They share only the configuration, the
/// provider clients and the audit log. Cloning the orchestrator is cheap and
/// every clone sees the same runs.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    inner: Arc<Inner>,
}

impl PipelineOrchestrator {
    /// Build the HTTP backends, the regex scanner, the configured output
    /// destinations and the audit log from `config`.
    ///
    /// # Errors
    ///
    /// - `CharterError::Llm` when a provider backend cannot be constructed
    /// - `CharterError::Gate` when the scanner patterns fail to compile
    /// - `CharterError::Config` when the audit path is not valid UTF-8
    pub fn new(config: Config) -> Result<Self, CharterError> {
        let selector = Arc::new(ProviderSelector::from_config(&config)?);
        let scanner = RegexScanner::new().map_err(|e| GateError::ScanUnavailable(e.to_string()))?;
        let audit = match &config.audit.path {
            Some(path) => {
                let path = Utf8PathBuf::from_path_buf(path.clone()).map_err(|p| {
                    ConfigError::InvalidValue {
                        key: "audit.path".to_string(),
                        value: p.display().to_string(),
                    }
                })?;
                AuditLog::to_file(path)
            }
            None => AuditLog::in_memory(),
        };
        let destinations = destinations_from_config(&config.output);
        Ok(Self::assemble(config, selector, Arc::new(scanner), destinations, audit))
    }

    #[must_use]
    pub fn with_components(config: Config, components: Components) -> Self {
        let destinations = components.destinations.into_iter().map(Ok).collect();
        Self::assemble(
            config,
            components.selector,
            components.scanner,
            destinations,
            components.audit,
        )
    }

    fn assemble(
        config: Config,
        selector: Arc<ProviderSelector>,
        scanner: Arc<dyn SensitivityScanner>,
        destinations: Vec<Result<Arc<dyn OutputDestination>, OutputError>>,
        audit: AuditLog,
    ) -> Self {
        let gate = PrivacyGate::new(scanner, &config.privacy);
        Self {
            inner: Arc::new(Inner {
                research: ResearchCoordinator::new(Arc::clone(&selector)),
                generator: DocumentBatchGenerator::new(Arc::clone(&selector)),
                config: Arc::new(config),
                selector,
                gate,
                destinations,
                audit,
                runs: RwLock::new(HashMap::new()),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.inner.audit
    }

    /// Probe both generation backends.
    pub async fn health(&self) -> HealthReport {
        self.inner.selector.health_report().await
    }

    /// Validate `input`, discover agents, scan for sensitive content and
    /// park the run at the approval gate.
    ///
    /// A scan failure in strict mode fails the run; its id is still returned
    /// so the failure can be inspected.
    ///
    /// # Errors
    ///
    /// `InvalidInput` or `Config` before any run is created.
    pub async fn create_run(
        &self,
        input: ProjectInput,
        overrides: RunOverrides,
    ) -> Result<RunId, CharterError> {
        let input = input
            .normalized()
            .map_err(|(field, reason)| CharterError::InvalidInput {
                field: field.to_string(),
                reason,
            })?;
        let settings = self.inner.config.run_settings(&overrides)?;

        let run_id = RunId::generate(&input.name);
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        let slot = Arc::new(RunSlot::new(run_id.clone(), sequence, input, settings));
        self.inner
            .runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id.clone(), Arc::clone(&slot));

        self.inner.audit.record(AuditEntry::ok(
            AuditAction::RunCreated,
            &run_id,
            json!({
                "name": slot.input.name,
                "preference": slot.settings.preference,
                "fallback_enabled": slot.settings.fallback_enabled,
            }),
        ));
        info!(run_id = %run_id, name = %slot.input.name, "Run created");

        let inner = Arc::clone(&self.inner);
        async move { inner.discover_and_scan(&slot).await }
            .instrument(phase_span(run_id.as_str(), "intake"))
            .await;
        Ok(run_id)
    }

    /// Agents and findings, once the privacy review has finished.
    ///
    /// # Errors
    ///
    /// `RunNotFound`, or `NotAvailable` before the scan has completed.
    pub fn get_discovery(&self, run_id: &RunId) -> Result<DiscoveryView, CharterError> {
        let slot = self.inner.slot(run_id)?;
        let phase = slot.phase();
        match self.inner.gate.snapshot(run_id) {
            Some(snapshot)
                if phase.has_reached(ProjectPhase::AwaitingApproval)
                    || phase == ProjectPhase::Failed =>
            {
                Ok(DiscoveryView::new(slot.agents(), snapshot))
            }
            _ => Err(not_available(run_id, "discovery", phase)),
        }
    }

    /// Record the approval decision. Approval starts the pipeline task;
    /// denial fails the run.
    ///
    /// # Errors
    ///
    /// - `RunNotFound`
    /// - `Gate(AlreadyDecided)` when a decision exists
    /// - `RunNotAwaitingApproval` for any other phase
    /// - `Gate(InvalidDecision)` for an inconsistent decision
    ///
    /// Misuse never changes the run.
    pub async fn approve(
        &self,
        run_id: &RunId,
        decision: ApprovalDecision,
    ) -> Result<(), CharterError> {
        let inner = &self.inner;
        let slot = inner.slot(run_id)?;
        let approved = decision.approved;
        let audit_details = json!({
            "use_sanitized": decision.use_sanitized,
            "overrides": decision.overrides.len(),
        });

        slot.with_state(|state| {
            if state.phase != ProjectPhase::AwaitingApproval {
                if inner.gate.decision(run_id).is_some() {
                    return Err(CharterError::Gate(GateError::AlreadyDecided {
                        run_id: run_id.to_string(),
                    }));
                }
                return Err(CharterError::RunNotAwaitingApproval {
                    run_id: run_id.to_string(),
                    phase: state.phase,
                });
            }
            inner.gate.record_decision(run_id, decision)?;
            if approved {
                state.transition(ProjectPhase::Researching)?;
            } else {
                state.fail(DENIED_DETAIL)?;
            }
            Ok(())
        })?;

        if !approved {
            inner
                .audit
                .record(AuditEntry::ok(AuditAction::PrivacyDenied, run_id, audit_details));
            inner.record_failure(&slot, ProjectPhase::AwaitingApproval, DENIED_DETAIL);
            return Ok(());
        }

        inner
            .audit
            .record(AuditEntry::ok(AuditAction::PrivacyApproved, run_id, audit_details));
        inner.record_phase_change(&slot, ProjectPhase::AwaitingApproval, ProjectPhase::Researching);

        let project_context = project_context(&slot.input.name, &inner.gate.resolved_text(run_id)?);
        tokio::spawn(Arc::clone(inner).supervise(slot, project_context));
        Ok(())
    }

    /// Wait until the run is terminal, or parked at the approval gate, and
    /// return its phase.
    ///
    /// # Errors
    ///
    /// `RunNotFound`.
    pub async fn wait(&self, run_id: &RunId) -> Result<ProjectPhase, CharterError> {
        let slot = self.inner.slot(run_id)?;
        let mut phases = slot.subscribe();
        let phase = match phases
            .wait_for(|p| p.is_terminal() || *p == ProjectPhase::AwaitingApproval)
            .await
        {
            Ok(phase) => *phase,
            Err(_) => slot.phase(),
        };
        Ok(phase)
    }

    /// Request cancellation and return the phase afterwards.
    ///
    /// A run waiting for approval fails immediately. A running pipeline
    /// stops at its next transition or batch boundary. Terminal runs are
    /// unaffected.
    ///
    /// # Errors
    ///
    /// `RunNotFound`.
    pub fn cancel(&self, run_id: &RunId) -> Result<ProjectPhase, CharterError> {
        let slot = self.inner.slot(run_id)?;
        slot.cancel.store(true, Ordering::SeqCst);

        let detail = format!("Run cancelled during {}", ProjectPhase::AwaitingApproval);
        let failed_at_gate = slot.with_state(|state| {
            state.phase == ProjectPhase::AwaitingApproval && state.fail(detail.clone()).is_ok()
        });
        if failed_at_gate {
            self.inner
                .record_failure(&slot, ProjectPhase::AwaitingApproval, &detail);
        }
        info!(run_id = %run_id, phase = %slot.phase(), "Cancellation requested");
        Ok(slot.phase())
    }

    /// # Errors
    ///
    /// `RunNotFound`.
    pub fn get_status(&self, run_id: &RunId) -> Result<RunStatus, CharterError> {
        Ok(self.inner.slot(run_id)?.status())
    }

    /// Documents, quality report and output records of a terminal run.
    /// Failed runs return whatever was produced before the failure.
    ///
    /// # Errors
    ///
    /// `RunNotFound`, or `NotAvailable` while the run is still active.
    pub fn get_result(&self, run_id: &RunId) -> Result<RunResult, CharterError> {
        let slot = self.inner.slot(run_id)?;
        let phase = slot.phase();
        if !phase.is_terminal() {
            return Err(not_available(run_id, "result", phase));
        }
        Ok(RunResult {
            run_id: run_id.clone(),
            phase,
            documents: slot.ledger.snapshot(),
            quality: slot.quality(),
            outputs: slot.outputs(),
        })
    }

    /// Summaries of every run, oldest first.
    #[must_use]
    pub fn list_runs(&self) -> Vec<RunSummary> {
        let runs = self
            .inner
            .runs
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut slots: Vec<&Arc<RunSlot>> = runs.values().collect();
        slots.sort_by_key(|s| s.sequence);
        slots.into_iter().map(|s| s.summary()).collect()
    }

    /// Regenerate one document of a completed run.
    ///
    /// The new revision replaces the slot and the quality report is
    /// recomputed. On failure the previous document is kept.
    ///
    /// # Errors
    ///
    /// - `RunNotFound`
    /// - `NotAvailable` unless the run is completed
    /// - `InvalidInput` when `doc_type` is not in the run's plan
    /// - `Llm` when the provider call fails
    pub async fn regenerate_document(
        &self,
        run_id: &RunId,
        doc_type: DocumentType,
    ) -> Result<Arc<GeneratedDocument>, CharterError> {
        let inner = &self.inner;
        let slot = inner.slot(run_id)?;
        let phase = slot.phase();
        if phase != ProjectPhase::Completed {
            return Err(not_available(run_id, "document regeneration", phase));
        }
        if slot.settings.batches.batch_of(doc_type).is_none() {
            return Err(CharterError::InvalidInput {
                field: "doc_type".to_string(),
                reason: format!("{doc_type} is not part of this run's batch plan"),
            });
        }

        let _serialized = slot.regeneration.lock().await;
        let brief = slot.brief().unwrap_or_default();
        let context = project_context(&slot.input.name, &inner.gate.resolved_text(run_id)?);
        let input = GenerationInput {
            run_id,
            brief: &brief,
            project_context: &context,
            settings: &slot.settings,
        };

        match inner.generator.regenerate_one(&input, doc_type, &slot.ledger).await {
            Ok(document) => {
                inner.audit.record(AuditEntry::ok(
                    AuditAction::GenerationCall,
                    run_id,
                    document_details(&document),
                ));
                if let Some(provider) = document.provider {
                    slot.with_state(|s| s.provider = Some(provider));
                }
                let report =
                    QualityValidator::new(slot.settings.batches.clone()).validate(&slot.ledger.snapshot());
                slot.set_quality(report);
                info!(run_id = %run_id, doc = %doc_type, revision = document.revision, "Document regenerated");
                Ok(document)
            }
            Err(e) => {
                inner.audit.record(AuditEntry::failed(
                    AuditAction::GenerationCall,
                    run_id,
                    json!({"document": doc_type, "regeneration": true}),
                    e.to_string(),
                ));
                warn!(run_id = %run_id, doc = %doc_type, error = %e, "Regeneration failed, keeping previous document");
                Err(e.into())
            }
        }
    }
}

impl Inner {
    fn slot(&self, run_id: &RunId) -> Result<Arc<RunSlot>, CharterError> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned()
            .ok_or_else(|| CharterError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn discover_and_scan(&self, slot: &RunSlot) {
        let run_id = &slot.run_id;
        log_phase_start(run_id.as_str(), ProjectPhase::AgentDiscovery.as_str());
        let agents = discover(&slot.input);
        info!(run_id = %run_id, agents = agents.len(), "Agents discovered");
        slot.set_agents(agents);

        if let Err(e) = self.advance(slot, ProjectPhase::PrivacyReview) {
            self.fail_run(slot, &e.to_string());
            return;
        }

        match self.gate.scan(run_id, &slot.input.full_text()).await {
            Ok(snapshot) => {
                self.audit.record(AuditEntry::ok(
                    AuditAction::PrivacyScanned,
                    run_id,
                    json!({
                        "findings": snapshot.findings.len(),
                        "blocking": snapshot.blocking.len(),
                        "degraded": snapshot.degraded,
                    }),
                ));
                if let Err(e) = self.advance(slot, ProjectPhase::AwaitingApproval) {
                    self.fail_run(slot, &e.to_string());
                }
            }
            Err(e) => {
                self.audit.record(AuditEntry::failed(
                    AuditAction::PrivacyScanned,
                    run_id,
                    json!({}),
                    e.to_string(),
                ));
                self.fail_run(slot, &e.to_string());
            }
        }
    }

    /// Run the pipeline task and fail the run if it dies without settling.
    async fn supervise(self: Arc<Self>, slot: Arc<RunSlot>, project_context: String) {
        let span = phase_span(slot.run_id.as_str(), "pipeline");
        let task = tokio::spawn({
            let inner = Arc::clone(&self);
            let slot = Arc::clone(&slot);
            async move { inner.run_pipeline(&slot, &project_context).await }.instrument(span)
        });
        if let Err(e) = task.await {
            self.fail_run(&slot, &format!("pipeline task aborted: {e}"));
        }
    }

    async fn run_pipeline(&self, slot: &RunSlot, project_context: &str) {
        let outcome = match self.execute_phases(slot, project_context).await {
            Ok(()) => self.advance(slot, ProjectPhase::Completed),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => info!(run_id = %slot.run_id, "Run completed"),
            Err(e) => self.fail_run(slot, &e.to_string()),
        }
    }

    async fn execute_phases(&self, slot: &RunSlot, project_context: &str) -> Result<(), PhaseError> {
        let run_id = &slot.run_id;
        let settings = &slot.settings;

        if slot.is_cancelled() {
            return Err(PhaseError::Cancelled {
                phase: ProjectPhase::Researching,
            });
        }
        log_phase_start(run_id.as_str(), ProjectPhase::Researching.as_str());
        let agents = slot.agents();
        let brief = self
            .research
            .execute(run_id, &agents, project_context, settings, &slot.cancel)
            .await?;
        self.record_research(slot, &brief);
        let brief = Arc::new(brief);
        slot.set_brief(Arc::clone(&brief));

        self.advance(slot, ProjectPhase::Generating)?;
        let input = GenerationInput {
            run_id,
            brief: &brief,
            project_context,
            settings,
        };
        let outcome = self
            .generator
            .execute(&input, &slot.ledger, &slot.cancel)
            .await;
        self.record_generation(slot);
        if outcome?.cancelled {
            return Err(PhaseError::Cancelled {
                phase: ProjectPhase::Generating,
            });
        }

        self.advance(slot, ProjectPhase::QualityCheck)?;
        let report = QualityValidator::new(settings.batches.clone()).validate(&slot.ledger.snapshot());
        slot.set_quality(report);

        self.advance(slot, ProjectPhase::Outputting)?;
        self.write_outputs(slot).await;
        Ok(())
    }

    /// Transition `slot` to `to`, honouring a pending cancellation.
    fn advance(&self, slot: &RunSlot, to: ProjectPhase) -> Result<(), PhaseError> {
        let from = slot.phase();
        if slot.is_cancelled() {
            return Err(PhaseError::Cancelled { phase: from });
        }
        slot.transition(to)?;
        self.record_phase_change(slot, from, to);
        if !to.is_terminal() {
            log_phase_start(slot.run_id.as_str(), to.as_str());
        }
        Ok(())
    }

    fn record_phase_change(&self, slot: &RunSlot, from: ProjectPhase, to: ProjectPhase) {
        let state = slot.state();
        if let (Some(start), Some(end)) = (
            state.phase_timestamps.get(&from),
            state.phase_timestamps.get(&to),
        ) {
            let duration_ms = (*end - *start).num_milliseconds().max(0) as u128;
            log_phase_complete(slot.run_id.as_str(), from.as_str(), duration_ms);
        }
        self.audit.record(AuditEntry::ok(
            AuditAction::PhaseChanged,
            &slot.run_id,
            json!({"from": from, "to": to}),
        ));
    }

    /// Fail the run with `"<phase>: <cause>"`.
    fn fail_run(&self, slot: &RunSlot, cause: &str) {
        let phase = slot.phase();
        let detail = format!("{phase}: {cause}");
        if slot.fail(detail.clone()) {
            self.record_failure(slot, phase, &detail);
        }
    }

    fn record_failure(&self, slot: &RunSlot, phase: ProjectPhase, detail: &str) {
        let state = slot.state();
        let duration_ms = state
            .phase_timestamps
            .get(&phase)
            .map(|start| (Utc::now() - *start).num_milliseconds().max(0) as u128)
            .unwrap_or_default();
        log_phase_error(slot.run_id.as_str(), phase.as_str(), detail, duration_ms);
        self.audit.record(AuditEntry::failed(
            AuditAction::Error,
            &slot.run_id,
            json!({"phase": phase}),
            detail,
        ));
        self.audit.record(AuditEntry::ok(
            AuditAction::PhaseChanged,
            &slot.run_id,
            json!({"from": phase, "to": ProjectPhase::Failed}),
        ));
    }

    fn record_research(&self, slot: &RunSlot, brief: &ResearchBrief) {
        for (agent_id, entry) in &brief.entries {
            let audit = match &entry.findings {
                AgentFindings::Completed { raw_text } => AuditEntry::ok(
                    AuditAction::ResearchCall,
                    &slot.run_id,
                    json!({"agent": agent_id, "name": entry.agent_name, "chars": raw_text.len()}),
                ),
                AgentFindings::Unavailable { reason } => AuditEntry::failed(
                    AuditAction::ResearchCall,
                    &slot.run_id,
                    json!({"agent": agent_id, "name": entry.agent_name}),
                    reason,
                ),
            };
            self.audit.record(audit);
        }
    }

    fn record_generation(&self, slot: &RunSlot) {
        let documents = slot.ledger.snapshot();
        for doc in &documents {
            let entry = match &doc.error {
                None => AuditEntry::ok(AuditAction::GenerationCall, &slot.run_id, document_details(doc)),
                Some(error) => AuditEntry::failed(
                    AuditAction::GenerationCall,
                    &slot.run_id,
                    document_details(doc),
                    error,
                ),
            };
            self.audit.record(entry);
        }

        let last_provider = documents
            .iter()
            .filter(|d| d.succeeded())
            .max_by_key(|d| d.generated_at)
            .and_then(|d| d.provider);
        if let Some(provider) = last_provider {
            slot.with_state(|s| s.provider = Some(provider));
        }

        let succeeded = documents.iter().filter(|d| d.succeeded()).count();
        self.audit.record(AuditEntry::ok(
            AuditAction::DocumentsGenerated,
            &slot.run_id,
            json!({
                "succeeded": succeeded,
                "failed": documents.len() - succeeded,
                "planned": slot.ledger.total(),
            }),
        ));
    }

    async fn write_outputs(&self, slot: &RunSlot) {
        let run = OutputRun {
            run_id: slot.run_id.clone(),
            project_name: slot.input.name.clone(),
            created_at: slot.state().created_at,
        };
        let documents = slot.ledger.snapshot();

        for destination in &self.destinations {
            let record = match destination {
                Ok(dest) => match dest.write(&run, &documents).await {
                    Ok(report) => OutputRecord {
                        destination: dest.kind().to_string(),
                        report: Some(report),
                        error: None,
                    },
                    Err(e) => OutputRecord {
                        destination: dest.kind().to_string(),
                        report: None,
                        error: Some(e.to_string()),
                    },
                },
                Err(e) => OutputRecord {
                    destination: destination_name(e).to_string(),
                    report: None,
                    error: Some(e.to_string()),
                },
            };

            let details = json!({
                "destination": record.destination,
                "documents": record.report.as_ref().map(|r| r.documents_written),
                "location": record.report.as_ref().map(|r| r.location.clone()),
            });
            match &record.error {
                None => {
                    info!(run_id = %slot.run_id, destination = %record.destination, "Output written");
                    self.audit
                        .record(AuditEntry::ok(AuditAction::OutputWritten, &slot.run_id, details));
                }
                Some(error) => {
                    warn!(run_id = %slot.run_id, destination = %record.destination, error = %error, "Output destination failed");
                    self.audit.record(AuditEntry::failed(
                        AuditAction::OutputWritten,
                        &slot.run_id,
                        details,
                        error,
                    ));
                }
            }
            slot.push_output(record);
        }
    }
}

/// Text handed to research and generation prompts.
pub(crate) fn project_context(name: &str, approved_text: &str) -> String {
    format!("Project: {name}\n\n{approved_text}")
}

fn document_details(doc: &GeneratedDocument) -> serde_json::Value {
    json!({
        "document": doc.doc_type,
        "batch": doc.batch,
        "provider": doc.provider,
        "word_count": doc.word_count,
        "truncated": doc.truncated,
        "revision": doc.revision,
    })
}

fn destination_name(err: &OutputError) -> &str {
    match err {
        OutputError::Write { destination, .. }
        | OutputError::Command { destination, .. }
        | OutputError::Http { destination, .. }
        | OutputError::Misconfigured { destination, .. } => destination,
    }
}

fn not_available(run_id: &RunId, what: &str, phase: ProjectPhase) -> CharterError {
    CharterError::NotAvailable {
        run_id: run_id.to_string(),
        what: what.to_string(),
        phase,
    }
}
