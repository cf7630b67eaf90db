//! Document generation phase.
//!
//! Documents are produced batch by batch. Each batch sees the frozen bodies
//! of every earlier batch through the run's [`DocumentLedger`].

mod generator;
mod ledger;
mod prompt;
mod truncation;

pub use generator::{DocumentBatchGenerator, GenerationInput, GenerationOutcome};
pub use ledger::DocumentLedger;
pub use prompt::{WRITING_STYLE_RULES, build_generation_prompt};
pub use truncation::{TruncationReason, detect_truncation};
