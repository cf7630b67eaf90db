//! Run lifecycle for charter.
//!
//! [`PipelineOrchestrator`] owns every run. A run is created with discovery
//! and the privacy scan, parks at the approval gate, then executes research,
//! batched generation, quality validation and output dispatch on its own
//! task. Callers observe progress by polling [`RunStatus`] or waiting on the
//! phase.

pub mod audit;
mod orchestrator;
mod run;
pub mod state;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use orchestrator::{Components, PipelineOrchestrator};
pub use run::{DiscoveryView, OutputRecord, RunResult, RunStatus, RunSummary};
pub use state::RunState;
