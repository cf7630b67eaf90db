use serde::{Deserialize, Serialize};
use std::fmt;

use charter_utils::documents::DocumentType;

pub const MIN_SCORE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One finding. Issues are advisory and never fail a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub documents: Vec<DocumentType>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl QualityIssue {
    #[must_use]
    pub fn warning(documents: Vec<DocumentType>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            documents,
            description: description.into(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn info(documents: Vec<DocumentType>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            documents,
            description: description.into(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => Self::A,
            s if s >= 0.8 => Self::B,
            s if s >= 0.7 => Self::C,
            s if s >= 0.6 => Self::D,
            _ => Self::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        write!(f, "{letter}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
    pub score: f64,
    pub grade: Grade,
}

impl QualityReport {
    #[must_use]
    pub fn from_issues(issues: Vec<QualityIssue>) -> Self {
        let score = score(&issues);
        Self {
            grade: Grade::from_score(score),
            issues,
            score,
        }
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    #[must_use]
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issues that mention `doc`.
    pub fn issues_for(&self, doc: DocumentType) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(move |i| i.documents.contains(&doc))
    }
}

/// Tiered deduction: warnings cost 0.02 each for the first five, 0.01 for
/// the next ten and 0.005 after that; each info costs 0.002.
#[must_use]
pub fn score(issues: &[QualityIssue]) -> f64 {
    let warnings = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .count();
    let infos = issues.len() - warnings;

    let tier1 = warnings.min(5) as f64;
    let tier2 = warnings.saturating_sub(5).min(10) as f64;
    let tier3 = warnings.saturating_sub(15) as f64;

    let deduction = tier1 * 0.02 + tier2 * 0.01 + tier3 * 0.005 + infos as f64 * 0.002;
    (1.0 - deduction).max(MIN_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn issues(warnings: usize, infos: usize) -> Vec<QualityIssue> {
        let mut out = vec![QualityIssue::warning(vec![], "w"); warnings];
        out.extend(vec![QualityIssue::info(vec![], "i"); infos]);
        out
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_clean_set_scores_one() {
        let report = QualityReport::from_issues(vec![]);
        assert!(close(report.score, 1.0));
        assert_eq!(report.grade, Grade::A);
    }

    #[test]
    fn test_tiered_deductions() {
        assert!(close(score(&issues(5, 0)), 0.90));
        assert!(close(score(&issues(15, 0)), 0.80));
        assert!(close(score(&issues(17, 0)), 0.79));
        assert!(close(score(&issues(0, 10)), 0.98));
    }

    #[test]
    fn test_grade_cutoffs() {
        assert_eq!(Grade::from_score(0.9), Grade::A);
        assert_eq!(Grade::from_score(0.89), Grade::B);
        assert_eq!(Grade::from_score(0.7), Grade::C);
        assert_eq!(Grade::from_score(0.6), Grade::D);
        assert_eq!(Grade::from_score(0.59), Grade::F);
    }

    #[test]
    fn test_score_floor() {
        let report = QualityReport::from_issues(issues(500, 500));
        assert!(close(report.score, MIN_SCORE));
        assert_eq!(report.grade, Grade::F);
    }

    proptest! {
        /// **Property: score stays in [0.15, 1.0] and never rises with more warnings**
        #[test]
        fn prop_score_bounded_and_monotonic(w in 0usize..200, i in 0usize..200) {
            let s = score(&issues(w, i));
            prop_assert!((MIN_SCORE..=1.0).contains(&s));
            prop_assert!(score(&issues(w + 1, i)) <= s);
        }
    }
}
