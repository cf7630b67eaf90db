use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use strum::EnumIter;

use crate::documents::DocumentType;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier for one pipeline run.
///
/// Identifiers are derived from a BLAKE3 hash over the project name, the
/// creation instant and a process-local counter, so two runs created in the
/// same nanosecond for the same name still receive distinct ids.
///
/// ```rust
/// use charter_utils::types::RunId;
///
/// let a = RunId::generate("Clinic Outreach");
/// let b = RunId::generate("Clinic Outreach");
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("run-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    #[must_use]
    pub fn generate(name: &str) -> Self {
        let counter = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&counter.to_le_bytes());
        let hex = hasher.finalize().to_hex();

        Self(format!("run-{}", &hex.as_str()[..16]))
    }

    /// Wrap an existing identifier, e.g. one supplied on the command line.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phases of a project run.
///
/// Runs move strictly forward through this sequence:
///
/// ```text
/// AgentDiscovery → PrivacyReview → AwaitingApproval → Researching
///     → Generating → QualityCheck → Outputting → Completed
/// ```
///
/// `Failed` is reachable from every non-terminal phase. `Completed` and
/// `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    AgentDiscovery,
    PrivacyReview,
    AwaitingApproval,
    Researching,
    Generating,
    QualityCheck,
    Outputting,
    Completed,
    Failed,
}

impl ProjectPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AgentDiscovery => "agent_discovery",
            Self::PrivacyReview => "privacy_review",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Researching => "researching",
            Self::Generating => "generating",
            Self::QualityCheck => "quality_check",
            Self::Outputting => "outputting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The immediate successor along the happy path, if any.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::AgentDiscovery => Some(Self::PrivacyReview),
            Self::PrivacyReview => Some(Self::AwaitingApproval),
            Self::AwaitingApproval => Some(Self::Researching),
            Self::Researching => Some(Self::Generating),
            Self::Generating => Some(Self::QualityCheck),
            Self::QualityCheck => Some(Self::Outputting),
            Self::Outputting => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Whether `self → target` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Failed || self.next() == Some(target)
    }

    /// Whether this phase has already passed `other` (or is `other`).
    ///
    /// `Failed` is not ordered after anything.
    #[must_use]
    pub fn has_reached(&self, other: Self) -> bool {
        *self != Self::Failed && *self >= other
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two generation backends a run can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Self-hosted inference server.
    Local,
    /// Hosted API with web search.
    Remote,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }

    #[must_use]
    pub const fn other(&self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "llamacpp" => Ok(Self::Local),
            "remote" | "claude" | "anthropic" => Ok(Self::Remote),
            other => Err(format!("unknown provider '{other}' (expected local or remote)")),
        }
    }
}

/// Closed taxonomy of sensitive-content categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyCategory {
    PersonallyIdentifying,
    ContactInformation,
    GovernmentIdentifier,
    Financial,
    HealthRelated,
    OrganizationSensitive,
    Location,
}

impl PrivacyCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PersonallyIdentifying => "personally_identifying",
            Self::ContactInformation => "contact_information",
            Self::GovernmentIdentifier => "government_identifier",
            Self::Financial => "financial",
            Self::HealthRelated => "health_related",
            Self::OrganizationSensitive => "organization_sensitive",
            Self::Location => "location",
        }
    }

    /// Placeholder used when a finding carries no suggested replacement.
    #[must_use]
    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::PersonallyIdentifying => "[PERSON]",
            Self::ContactInformation => "[CONTACT]",
            Self::GovernmentIdentifier => "[GOVERNMENT_ID]",
            Self::Financial => "[FINANCIAL]",
            Self::HealthRelated => "[HEALTH_INFO]",
            Self::OrganizationSensitive => "[ORGANIZATION]",
            Self::Location => "[LOCATION]",
        }
    }
}

impl fmt::Display for PrivacyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged span of potentially sensitive text.
///
/// `start..end` is a byte range into the scanned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyFinding {
    pub category: PrivacyCategory,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_replacement: Option<String>,
    /// Surrounding text shown to the reviewer.
    #[serde(default)]
    pub context: String,
}

impl PrivacyFinding {
    #[must_use]
    pub fn replacement(&self) -> &str {
        self.suggested_replacement
            .as_deref()
            .unwrap_or_else(|| self.category.placeholder())
    }

    /// Findings at or above the threshold block approval of original text.
    #[must_use]
    pub fn is_blocking(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

/// A unit of research work produced by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    /// Display name, e.g. "Healthcare - Healthcare Compliance Researcher".
    pub name: String,
    pub role: String,
    pub purpose: String,
    pub domain_category: String,
    pub primary_questions: Vec<String>,
    pub search_terms: Vec<String>,
    pub target_documents: Vec<DocumentType>,
    pub can_parallelize: bool,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl AgentDefinition {
    #[must_use]
    pub fn feeds(&self, doc: DocumentType) -> bool {
        self.target_documents.contains(&doc)
    }
}

/// Raw user submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

pub const NAME_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 10_000;

impl ProjectInput {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            additional_context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Trim fields and enforce length bounds.
    ///
    /// Returns `(field, reason)` for the first violation.
    pub fn normalized(&self) -> Result<Self, (&'static str, String)> {
        let name = self.name.trim().to_string();
        let description = self.description.trim().to_string();

        let name_len = name.chars().count();
        if name_len == 0 || name_len > NAME_MAX_CHARS {
            return Err((
                "name",
                format!("must be between 1 and {NAME_MAX_CHARS} characters (got {name_len})"),
            ));
        }

        let desc_len = description.chars().count();
        if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&desc_len) {
            return Err((
                "description",
                format!(
                    "must be between {DESCRIPTION_MIN_CHARS} and {DESCRIPTION_MAX_CHARS} characters (got {desc_len})"
                ),
            ));
        }

        let additional_context = self
            .additional_context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            name,
            description,
            additional_context,
        })
    }

    /// Description plus any additional context, as scanned by the privacy gate.
    #[must_use]
    pub fn full_text(&self) -> String {
        match &self.additional_context {
            Some(ctx) => format!("{}\n\n{}", self.description, ctx),
            None => self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_phase_sequence_is_linear() {
        let mut phase = ProjectPhase::AgentDiscovery;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(phase.can_transition_to(next));
            phase = next;
            seen.push(phase);
        }
        assert_eq!(phase, ProjectPhase::Completed);
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal() {
        for phase in ProjectPhase::iter().filter(|p| !p.is_terminal()) {
            assert!(phase.can_transition_to(ProjectPhase::Failed), "{phase}");
        }
        assert!(!ProjectPhase::Completed.can_transition_to(ProjectPhase::Failed));
        assert!(!ProjectPhase::Failed.can_transition_to(ProjectPhase::Failed));
    }

    #[test]
    fn test_no_skips_or_reversals() {
        assert!(!ProjectPhase::AwaitingApproval.can_transition_to(ProjectPhase::Generating));
        assert!(!ProjectPhase::Generating.can_transition_to(ProjectPhase::Researching));
        assert!(!ProjectPhase::PrivacyReview.can_transition_to(ProjectPhase::PrivacyReview));
    }

    #[test]
    fn test_has_reached() {
        assert!(ProjectPhase::Generating.has_reached(ProjectPhase::AwaitingApproval));
        assert!(ProjectPhase::AwaitingApproval.has_reached(ProjectPhase::AwaitingApproval));
        assert!(!ProjectPhase::PrivacyReview.has_reached(ProjectPhase::AwaitingApproval));
        assert!(!ProjectPhase::Failed.has_reached(ProjectPhase::AgentDiscovery));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("local".parse::<ProviderKind>(), Ok(ProviderKind::Local));
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Remote));
        assert!("gpt".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Local.other(), ProviderKind::Remote);
    }

    #[test]
    fn test_input_bounds() {
        let ok = ProjectInput::new("  Clinic  ", "A mobile health outreach app").normalized();
        assert_eq!(ok.map(|i| i.name), Ok("Clinic".to_string()));

        let err = ProjectInput::new("   ", "A mobile health outreach app").normalized();
        assert_eq!(err.map_err(|(f, _)| f), Err("name"));

        let err = ProjectInput::new("Clinic", "too short").normalized();
        assert_eq!(err.map_err(|(f, _)| f), Err("description"));
    }

    #[test]
    fn test_finding_replacement_falls_back_to_category() {
        let finding = PrivacyFinding {
            category: PrivacyCategory::HealthRelated,
            text: "MRN 1234".into(),
            start: 0,
            end: 8,
            confidence: 0.8,
            suggested_replacement: None,
            context: String::new(),
        };
        assert_eq!(finding.replacement(), "[HEALTH_INFO]");
        assert!(finding.is_blocking(0.7));
        assert!(!finding.is_blocking(0.9));
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&ProjectPhase::AwaitingApproval).unwrap();
        assert_eq!(json, "\"awaiting_approval\"");
    }
}
