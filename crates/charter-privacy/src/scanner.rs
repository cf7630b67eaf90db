//! Sensitive-content detection.
//!
//! [`SensitivityScanner`] is the seam for any detector. [`RegexScanner`] is
//! the built-in one: a table of patterns, each tagged with a category, a
//! confidence and a replacement placeholder.

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use charter_utils::types::{PrivacyCategory, PrivacyFinding};

/// The detector could not produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sensitivity scan failed: {0}")]
pub struct ScanError(pub String);

/// External sensitivity detector.
///
/// Returning zero findings is a valid outcome. Errors are handled by the
/// gate's strictness policy.
#[async_trait]
pub trait SensitivityScanner: Send + Sync {
    async fn scan(&self, text: &str) -> Result<Vec<PrivacyFinding>, ScanError>;
}

/// One detection rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivacyPatternDef {
    pub id: &'static str,
    pub category: PrivacyCategory,
    pub regex: &'static str,
    pub confidence: f64,
    pub replacement: &'static str,
    /// Capture group holding the sensitive span; 0 is the whole match.
    pub group: usize,
}

/// Built-in rules, most specific first.
pub static DEFAULT_PRIVACY_PATTERNS: &[PrivacyPatternDef] = &[
    PrivacyPatternDef {
        id: "email",
        category: PrivacyCategory::ContactInformation,
        regex: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        confidence: 0.95,
        replacement: "[EMAIL_ADDRESS]",
        group: 0,
    },
    PrivacyPatternDef {
        id: "phone",
        category: PrivacyCategory::ContactInformation,
        regex: r"(?:\+1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b",
        confidence: 0.85,
        replacement: "[PHONE_NUMBER]",
        group: 0,
    },
    PrivacyPatternDef {
        id: "us_ssn",
        category: PrivacyCategory::GovernmentIdentifier,
        regex: r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b",
        confidence: 0.75,
        replacement: "[US_SSN]",
        group: 0,
    },
    PrivacyPatternDef {
        id: "credit_card",
        category: PrivacyCategory::Financial,
        regex: r"\b(?:\d{4}[-\s]?){3}\d{4}\b",
        confidence: 0.8,
        replacement: "[CREDIT_CARD]",
        group: 0,
    },
    PrivacyPatternDef {
        id: "ip_address",
        category: PrivacyCategory::ContactInformation,
        regex: r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        confidence: 0.6,
        replacement: "[IP_ADDRESS]",
        group: 0,
    },
    PrivacyPatternDef {
        id: "medical_record",
        category: PrivacyCategory::HealthRelated,
        regex: r"(?i)\b(?:mrn|medical record(?: number| no\.?)?|patient id)\s*[:#]?\s*([A-Z]{0,3}-?\d[A-Z0-9-]{2,})",
        confidence: 0.8,
        replacement: "[MEDICAL_RECORD_NUMBER]",
        group: 1,
    },
    PrivacyPatternDef {
        id: "tribal_id",
        category: PrivacyCategory::GovernmentIdentifier,
        regex: r"(?i)\b(?:tribal (?:enrollment|id|member(?:ship)?)(?: number| no\.?| id)?|enrollment (?:number|no\.?|id))\s*[:#]?\s*([A-Z]{0,3}-?\d[A-Z0-9-]{2,})",
        confidence: 0.8,
        replacement: "[TRIBAL_ID]",
        group: 1,
    },
    PrivacyPatternDef {
        id: "date_of_birth",
        category: PrivacyCategory::PersonallyIdentifying,
        regex: r"(?i)\b(?:dob|date of birth|born(?: on)?)\s*[:#]?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
        confidence: 0.8,
        replacement: "[DATE_OF_BIRTH]",
        group: 1,
    },
    PrivacyPatternDef {
        id: "addressed_person",
        category: PrivacyCategory::PersonallyIdentifying,
        regex: r"(?:\b(?i:contact|call|email|text|reach|ask for|speak with|talk to)\s+(?:(?:Dr|Mr|Mrs|Ms)\.?\s+)?|\b(?:Dr|Mr|Mrs|Ms)\.?\s+)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        confidence: 0.85,
        replacement: "[PERSON]",
        group: 1,
    },
    PrivacyPatternDef {
        id: "person_name",
        category: PrivacyCategory::PersonallyIdentifying,
        regex: r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b",
        confidence: 0.6,
        replacement: "[PERSON]",
        group: 0,
    },
];

/// Capitalized words that start phrases far more often than names.
const NAME_STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Our", "We", "Call", "Contact", "Dr", "Mr", "Mrs", "Ms", "Project", "Program", "Health", "Community",
    "County", "State", "National", "Tribal", "Nation", "Department", "University", "College",
    "School", "Center", "Office", "Board", "Council", "Phase", "Mobile", "Rural", "North",
    "South", "East", "West", "New", "United", "States", "American", "Native", "Indian",
    "Federal", "Grant", "Fund", "Foundation", "January", "February", "March", "April", "May",
    "June", "July", "August", "September", "October", "November", "December", "Monday",
    "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

const CONTEXT_CHARS: usize = 20;

struct CompiledPattern {
    def: PrivacyPatternDef,
    regex: Regex,
}

/// Pattern-table scanner that runs entirely in-process.
pub struct RegexScanner {
    patterns: Vec<CompiledPattern>,
}

impl RegexScanner {
    /// Compile [`DEFAULT_PRIVACY_PATTERNS`].
    ///
    /// # Errors
    ///
    /// Returns the offending pattern id if a regex fails to compile.
    pub fn new() -> Result<Self, ScanError> {
        Self::with_patterns(DEFAULT_PRIVACY_PATTERNS)
    }

    pub fn with_patterns(defs: &[PrivacyPatternDef]) -> Result<Self, ScanError> {
        let patterns = defs
            .iter()
            .map(|def| {
                Regex::new(def.regex)
                    .map(|regex| CompiledPattern { def: *def, regex })
                    .map_err(|e| ScanError(format!("failed to compile {} regex: {e}", def.id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Synchronous detection, used by the async trait impl.
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<PrivacyFinding> {
        let mut findings = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(m) = caps.get(pattern.def.group) else {
                    continue;
                };
                if pattern.def.id == "person_name" && is_stopword_pair(&caps) {
                    continue;
                }
                findings.push(PrivacyFinding {
                    category: pattern.def.category,
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    confidence: pattern.def.confidence,
                    suggested_replacement: Some(pattern.def.replacement.to_string()),
                    context: context_around(text, m.start(), m.end()),
                });
            }
        }

        resolve_overlaps(findings)
    }
}

#[async_trait]
impl SensitivityScanner for RegexScanner {
    async fn scan(&self, text: &str) -> Result<Vec<PrivacyFinding>, ScanError> {
        Ok(self.detect(text))
    }
}

fn is_stopword_pair(caps: &regex::Captures<'_>) -> bool {
    [1, 2].iter().any(|&i| {
        caps.get(i)
            .is_some_and(|w| NAME_STOPWORDS.contains(&w.as_str()))
    })
}

/// Up to 20 characters either side of the span.
fn context_around(text: &str, start: usize, end: usize) -> String {
    let before: String = text[..start]
        .chars()
        .rev()
        .take(CONTEXT_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[end..].chars().take(CONTEXT_CHARS).collect();
    format!("...{before}{}{after}...", &text[start..end])
}

/// Keep one finding per overlapping region, preferring higher confidence.
fn resolve_overlaps(mut findings: Vec<PrivacyFinding>) -> Vec<PrivacyFinding> {
    findings.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.confidence.total_cmp(&a.confidence))
    });

    let mut kept: Vec<PrivacyFinding> = Vec::with_capacity(findings.len());
    for finding in findings {
        match kept.last_mut() {
            Some(last) if finding.start < last.end => {
                if finding.confidence > last.confidence {
                    *last = finding;
                }
            }
            _ => kept.push(finding),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> RegexScanner {
        RegexScanner::new().unwrap()
    }

    #[test]
    fn test_default_patterns_compile() {
        assert!(RegexScanner::new().is_ok());
    }

    #[test]
    fn test_contact_name_and_phone() {
        let text = "contact Jane Doe at 555-123-4567";
        let findings = scanner().detect(text);

        let person = findings
            .iter()
            .find(|f| f.category == PrivacyCategory::PersonallyIdentifying)
            .expect("person finding");
        assert_eq!(person.text, "Jane Doe");
        assert!(person.confidence > 0.5);
        assert_eq!(&text[person.start..person.end], "Jane Doe");

        let phone = findings
            .iter()
            .find(|f| f.suggested_replacement.as_deref() == Some("[PHONE_NUMBER]"))
            .expect("phone finding");
        assert_eq!(phone.text, "555-123-4567");
        assert_eq!(phone.category, PrivacyCategory::ContactInformation);
    }

    #[test]
    fn test_email_detected() {
        let findings = scanner().detect("Send notes to lead@clinic.org please.");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].text, "lead@clinic.org");
        assert_eq!(findings[0].confidence, 0.95);
    }

    #[test]
    fn test_keyword_patterns_capture_value_only() {
        let findings = scanner().detect("Patient MRN: A12345 was enrolled.");
        let mrn = findings
            .iter()
            .find(|f| f.category == PrivacyCategory::HealthRelated)
            .expect("mrn finding");
        assert_eq!(mrn.text, "A12345");

        let findings = scanner().detect("Tribal enrollment number: 4521-B");
        assert!(
            findings
                .iter()
                .any(|f| f.category == PrivacyCategory::GovernmentIdentifier && f.text == "4521-B")
        );
    }

    #[test]
    fn test_stopword_pairs_ignored() {
        let findings = scanner().detect("The Project will serve Rural Health clinics.");
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_clean_text_has_no_findings() {
        let findings = scanner().detect("a mobile health outreach app for rural clinics");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_overlaps_keep_highest_confidence() {
        let findings = scanner().detect("Call Dr. Maria Lopez tomorrow");
        let people: Vec<_> = findings
            .iter()
            .filter(|f| f.category == PrivacyCategory::PersonallyIdentifying)
            .collect();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].confidence, 0.85);
    }

    #[test]
    fn test_context_is_char_safe() {
        let text = "ééééééééééééééééééééééé call Ana Ruiz ééééééééééééééééééééééé";
        let findings = scanner().detect(text);
        assert!(!findings.is_empty());
        assert!(findings[0].context.contains("Ana Ruiz"));
    }
}
