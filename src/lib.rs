//! charter - privacy-gated pipeline that turns a project description into a
//! researched planning document set.
//!
//! A run moves through agent discovery, a privacy scan, a human approval
//! gate, batched research, batched document generation, quality validation
//! and output dispatch. Generation calls go to a local backend with failover
//! to a remote one.
//!
//! charter can be used in two ways:
//! - **CLI**: `charter run --name ... --description ...`
//! - **Library**: build a [`PipelineOrchestrator`] and drive runs directly
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use charter::{ApprovalDecision, Config, PipelineOrchestrator, ProjectInput, RunOverrides};
//!
//! # async fn demo() -> Result<(), charter::CharterError> {
//! let orchestrator = PipelineOrchestrator::new(Config::default())?;
//! let run_id = orchestrator
//!     .create_run(
//!         ProjectInput {
//!             name: "Clinic Intake".to_string(),
//!             description: "A web intake form for a rural health clinic.".to_string(),
//!             additional_context: None,
//!         },
//!         RunOverrides::default(),
//!     )
//!     .await?;
//!
//! let discovery = orchestrator.get_discovery(&run_id)?;
//! println!("{} agents, {} findings", discovery.agents.len(), discovery.privacy_findings.len());
//!
//! orchestrator.approve(&run_id, ApprovalDecision::approve_sanitized()).await?;
//! let phase = orchestrator.wait(&run_id).await?;
//! println!("run finished in {phase}");
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use charter_config::{CliArgs, Config, ConfigBuilder, RunOverrides, RunSettings};
pub use charter_llm::{HealthReport, ProviderClient, ProviderSelector};
pub use charter_orchestrator::{
    AuditAction, AuditEntry, AuditLog, Components, DiscoveryView, OutputRecord,
    PipelineOrchestrator, RunResult, RunState, RunStatus, RunSummary,
};
pub use charter_output::{DestinationReport, OutputDestination, OutputRun};
pub use charter_privacy::{ApprovalDecision, FindingOverride, SensitivityScanner};
pub use charter_quality::{Grade, QualityIssue, QualityReport, Severity};
pub use charter_utils::documents::{BatchPlan, DocumentType, GeneratedDocument};
pub use charter_utils::error::{CharterError, UserFriendlyError};
pub use charter_utils::exit_codes::ExitCode;
pub use charter_utils::types::{
    AgentDefinition, PrivacyFinding, ProjectInput, ProjectPhase, ProviderKind, RunId,
};
