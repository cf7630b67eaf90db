use std::sync::Arc;
use tracing::{debug, info};

use charter_utils::documents::{BatchPlan, GeneratedDocument};

use crate::cross_checks;
use crate::document_checks::check_document;
use crate::report::QualityReport;

/// Runs every per-document and cross-document check over a frozen set.
///
/// Validation is advisory: it never fails and never blocks the run.
#[derive(Debug, Clone)]
pub struct QualityValidator {
    plan: BatchPlan,
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new(BatchPlan::standard())
    }
}

impl QualityValidator {
    #[must_use]
    pub fn new(plan: BatchPlan) -> Self {
        Self { plan }
    }

    #[must_use]
    pub fn validate(&self, documents: &[Arc<GeneratedDocument>]) -> QualityReport {
        let mut issues = Vec::new();
        for doc in documents {
            let found = check_document(doc);
            debug!(doc = %doc.doc_type, issues = found.len(), "Checked document");
            issues.extend(found);
        }

        let index = cross_checks::index(documents);
        issues.extend(cross_checks::completeness(documents, &self.plan));
        issues.extend(cross_checks::missing_required_headings(&index));
        issues.extend(cross_checks::unused_glossary_terms(&index));
        issues.extend(cross_checks::undefined_acronyms(&index));
        issues.extend(cross_checks::budget_totals(&index));
        issues.extend(cross_checks::timeline_years(&index));
        issues.extend(cross_checks::stakeholder_consistency(&index));

        let report = QualityReport::from_issues(issues);
        info!(
            documents = documents.len(),
            warnings = report.warning_count(),
            infos = report.info_count(),
            score = report.score,
            grade = %report.grade,
            "Quality validation complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_utils::documents::DocumentType;
    use charter_utils::types::ProviderKind;
    use crate::report::{Grade, Severity};

    fn well_formed(doc_type: DocumentType) -> Arc<GeneratedDocument> {
        let mut body = format!("# {}\n", doc_type.title());
        for section in doc_type.required_sections() {
            body.push_str(&format!(
                "\n## {section}\n\nThe clinic team reviews intake records every week and \
                 shares a short summary with the council. Staff record each visit on paper \
                 first, then enter it into the shared system before the end of the day.\n"
            ));
        }
        Arc::new(GeneratedDocument::success(doc_type, 0, body, ProviderKind::Local, false))
    }

    #[test]
    fn test_empty_set_reports_incomplete_but_does_not_fail() {
        let validator = QualityValidator::default();
        let report = validator.validate(&[]);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues[0].documents.len(), 15);
        assert!(report.score > 0.9);
    }

    #[test]
    fn test_failed_slot_is_flagged_twice() {
        let plan = BatchPlan::new(vec![vec![DocumentType::Readme, DocumentType::Sops]]);
        let docs = vec![
            well_formed(DocumentType::Readme),
            Arc::new(GeneratedDocument::failure(DocumentType::Sops, 0, None, "timed out")),
        ];
        let report = QualityValidator::new(plan).validate(&docs);

        let about_sops: Vec<_> = report.issues_for(DocumentType::Sops).collect();
        assert_eq!(about_sops.len(), 2);
        assert!(about_sops.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(report.issues_for(DocumentType::Readme).count(), 0);
    }

    #[test]
    fn test_well_formed_pair_grades_a() {
        let plan = BatchPlan::new(vec![vec![DocumentType::Readme, DocumentType::ProjectBrief]]);
        let docs = vec![
            well_formed(DocumentType::Readme),
            well_formed(DocumentType::ProjectBrief),
        ];
        let report = QualityValidator::new(plan).validate(&docs);
        assert_eq!(report.warning_count(), 0, "{:?}", report.issues);
        assert_eq!(report.grade, Grade::A);
    }
}
