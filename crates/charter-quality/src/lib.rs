//! Quality validation for a generated document set.
//!
//! Checks are grouped into per-document checks (length, structure,
//! placeholders, filler and AI-styled vocabulary) and cross-document checks
//! (glossary usage, required headings, budget totals, timeline years,
//! stakeholder coverage and completeness). The result is a scored
//! [`QualityReport`]; nothing here can fail a run.

mod cross_checks;
mod document_checks;
mod report;
mod validator;
mod vocabulary;

pub use report::{Grade, MIN_SCORE, QualityIssue, QualityReport, Severity, score};
pub use validator::QualityValidator;
