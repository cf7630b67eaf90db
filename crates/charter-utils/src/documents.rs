//! The generated document set and its batch plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

use crate::types::ProviderKind;

/// The fifteen documents of a project set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Readme,
    ProjectBrief,
    Glossary,
    ContextBackground,
    StakeholderNotes,
    GoalsSuccess,
    ScopeBoundaries,
    InitialBudget,
    TimelineMilestones,
    RisksAssumptions,
    ProcessWorkflow,
    Sops,
    TaskBacklog,
    MeetingNotes,
    StatusUpdates,
}

impl DocumentType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Readme => "readme",
            Self::ProjectBrief => "project_brief",
            Self::Glossary => "glossary",
            Self::ContextBackground => "context_background",
            Self::StakeholderNotes => "stakeholder_notes",
            Self::GoalsSuccess => "goals_success",
            Self::ScopeBoundaries => "scope_boundaries",
            Self::InitialBudget => "initial_budget",
            Self::TimelineMilestones => "timeline_milestones",
            Self::RisksAssumptions => "risks_assumptions",
            Self::ProcessWorkflow => "process_workflow",
            Self::Sops => "sops",
            Self::TaskBacklog => "task_backlog",
            Self::MeetingNotes => "meeting_notes",
            Self::StatusUpdates => "status_updates",
        }
    }

    #[must_use]
    pub const fn folder(&self) -> &'static str {
        match self {
            Self::Readme | Self::ProjectBrief | Self::Glossary => "00-Overview",
            Self::ContextBackground | Self::StakeholderNotes => "10-Discovery",
            Self::GoalsSuccess
            | Self::ScopeBoundaries
            | Self::InitialBudget
            | Self::TimelineMilestones
            | Self::RisksAssumptions => "20-Planning",
            Self::ProcessWorkflow | Self::Sops | Self::TaskBacklog => "30-Execution",
            Self::MeetingNotes | Self::StatusUpdates => "40-Comms",
        }
    }

    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Readme => "README.md",
            Self::ProjectBrief => "Project-Brief.md",
            Self::Glossary => "Glossary.md",
            Self::ContextBackground => "Context-and-Background.md",
            Self::StakeholderNotes => "Stakeholder-Notes.md",
            Self::GoalsSuccess => "Goals-and-Success-Criteria.md",
            Self::ScopeBoundaries => "Scope-and-Boundaries.md",
            Self::InitialBudget => "Initial-Budget.md",
            Self::TimelineMilestones => "Timeline-and-Milestones.md",
            Self::RisksAssumptions => "Risks-and-Assumptions.md",
            Self::ProcessWorkflow => "Process-Workflow.md",
            Self::Sops => "SOPs.md",
            Self::TaskBacklog => "Task-Backlog.md",
            Self::MeetingNotes => "Meeting-Notes.md",
            Self::StatusUpdates => "Status-Updates.md",
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Readme => "Project Overview",
            Self::ProjectBrief => "Project Brief",
            Self::Glossary => "Glossary",
            Self::ContextBackground => "Context and Background",
            Self::StakeholderNotes => "Stakeholder Notes",
            Self::GoalsSuccess => "Goals and Success Criteria",
            Self::ScopeBoundaries => "Scope and Boundaries",
            Self::InitialBudget => "Initial Budget",
            Self::TimelineMilestones => "Timeline and Milestones",
            Self::RisksAssumptions => "Risks and Assumptions",
            Self::ProcessWorkflow => "Process Workflow",
            Self::Sops => "Standard Operating Procedures",
            Self::TaskBacklog => "Task Backlog",
            Self::MeetingNotes => "Meeting Notes",
            Self::StatusUpdates => "Status Updates",
        }
    }

    /// Filename without the `.md` extension; used for wiki links.
    #[must_use]
    pub fn stem(&self) -> &'static str {
        self.filename().trim_end_matches(".md")
    }

    /// H2 sections every generated body must carry.
    #[must_use]
    pub const fn required_sections(&self) -> &'static [&'static str] {
        match self {
            Self::Readme => &[
                "Quick Overview",
                "At a Glance",
                "Our Approach",
                "Key Deliverables",
                "Document Navigation",
            ],
            Self::ProjectBrief => &[
                "Executive Summary",
                "Problem Statement",
                "Proposed Solution",
                "Target Population & Beneficiaries",
                "Expected Outcomes & Impact",
            ],
            Self::Glossary => &[
                "How to Use This Glossary",
                "Project-Specific Terms",
                "Acronyms & Abbreviations",
            ],
            Self::ContextBackground => &[
                "Executive Context Summary",
                "Organizational Context",
                "Problem/Opportunity Analysis",
                "Stakeholder Landscape",
                "Funding & Resource Landscape",
            ],
            Self::StakeholderNotes => &[
                "Stakeholder Analysis Overview",
                "Stakeholder Categories",
                "Power/Interest Grid",
                "Engagement Strategy Matrix",
            ],
            Self::GoalsSuccess => &[
                "Executive Summary",
                "Strategic Goals",
                "Operational Objectives",
                "Success Metrics & KPIs",
                "Measurement & Evaluation Plan",
            ],
            Self::ScopeBoundaries => &[
                "Scope Overview",
                "In-Scope",
                "Out-of-Scope",
                "Deliverables",
                "Constraints",
                "Assumptions",
            ],
            Self::InitialBudget => &[
                "Budget Overview",
                "Personnel Costs",
                "Operating Expenses",
                "Indirect Costs",
                "Budget Narrative",
                "Cost-Effectiveness Analysis",
                "Budget Risks & Contingencies",
            ],
            Self::TimelineMilestones => &[
                "Timeline Overview",
                "Project Phases",
                "Milestone Schedule",
                "Critical Path Analysis",
                "Schedule Risks & Buffers",
            ],
            Self::RisksAssumptions => &[
                "Risk Assessment Overview",
                "Risk Matrix & Definitions",
                "Strategic Risks",
                "Operational Risks",
                "Financial Risks",
                "Key Assumptions",
            ],
            Self::ProcessWorkflow => &[
                "Process Overview",
                "Core Project Processes",
                "Process Dependencies",
                "Quality Checkpoints",
                "Exception Handling",
            ],
            Self::Sops => &[
                "SOP Overview",
                "Roles & Responsibilities",
                "Core Operating Procedures",
                "Communication Protocols",
                "Quality Assurance",
            ],
            Self::TaskBacklog => &[
                "Backlog Overview",
                "Prioritization Framework",
                "Initial Backlog Table",
                "Dependencies & Blockers",
            ],
            Self::MeetingNotes => &[
                "Attendees",
                "Agenda",
                "Discussion Notes",
                "Decisions Made",
                "Action Items",
            ],
            Self::StatusUpdates => &[
                "Executive Summary",
                "Status Dashboard",
                "Progress This Period",
                "Upcoming Activities",
                "Issues & Blockers",
                "Risks Update",
                "Budget Status",
            ],
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    /// Accepts the snake_case slug (`initial_budget`) or the file stem
    /// (`Initial-Budget`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches(".md").to_ascii_lowercase();
        Self::iter()
            .find(|d| d.as_str() == wanted || d.stem().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown document type '{s}'"))
    }
}

/// Ordered batches of documents. Later batches read every document of
/// strictly earlier batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchPlan {
    batches: Vec<Vec<DocumentType>>,
}

impl BatchPlan {
    #[must_use]
    pub fn new(batches: Vec<Vec<DocumentType>>) -> Self {
        Self { batches }
    }

    /// Foundation, discovery, planning, execution, then communication templates.
    #[must_use]
    pub fn standard() -> Self {
        use DocumentType::*;
        Self::new(vec![
            vec![Readme, ProjectBrief, Glossary],
            vec![ContextBackground, StakeholderNotes],
            vec![
                GoalsSuccess,
                ScopeBoundaries,
                InitialBudget,
                TimelineMilestones,
                RisksAssumptions,
            ],
            vec![ProcessWorkflow, Sops, TaskBacklog],
            vec![MeetingNotes, StatusUpdates],
        ])
    }

    #[must_use]
    pub fn batches(&self) -> &[Vec<DocumentType>] {
        &self.batches
    }

    #[must_use]
    pub fn total_documents(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn batch_of(&self, doc: DocumentType) -> Option<usize> {
        self.batches.iter().position(|b| b.contains(&doc))
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentType> + '_ {
        self.batches.iter().flatten().copied()
    }

    /// Reject empty plans, empty batches and duplicated documents.
    pub fn check(&self) -> Result<(), String> {
        if self.batches.is_empty() {
            return Err("batch plan must contain at least one batch".to_string());
        }
        let mut seen = Vec::new();
        for (idx, batch) in self.batches.iter().enumerate() {
            if batch.is_empty() {
                return Err(format!("batch {} is empty", idx + 1));
            }
            for doc in batch {
                if seen.contains(doc) {
                    return Err(format!("document '{doc}' appears in more than one batch"));
                }
                seen.push(*doc);
            }
        }
        Ok(())
    }
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// One filled (or failed) document slot.
///
/// Documents are frozen once stored; the ledger hands out `Arc`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub doc_type: DocumentType,
    pub title: String,
    pub body: String,
    /// Zero-based batch ordinal.
    pub batch: usize,
    pub provider: Option<ProviderKind>,
    pub generated_at: DateTime<Utc>,
    pub error: Option<String>,
    pub word_count: usize,
    pub truncated: bool,
    pub revision: u32,
}

impl GeneratedDocument {
    #[must_use]
    pub fn success(
        doc_type: DocumentType,
        batch: usize,
        body: String,
        provider: ProviderKind,
        truncated: bool,
    ) -> Self {
        Self {
            doc_type,
            title: doc_type.title().to_string(),
            word_count: body.split_whitespace().count(),
            body,
            batch,
            provider: Some(provider),
            generated_at: Utc::now(),
            error: None,
            truncated,
            revision: 1,
        }
    }

    #[must_use]
    pub fn failure(
        doc_type: DocumentType,
        batch: usize,
        provider: Option<ProviderKind>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            doc_type,
            title: doc_type.title().to_string(),
            body: String::new(),
            batch,
            provider,
            generated_at: Utc::now(),
            error: Some(error.into()),
            word_count: 0,
            truncated: false,
            revision: 1,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.doc_type.folder(), self.doc_type.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_plan_covers_every_document_once() {
        let plan = BatchPlan::standard();
        assert_eq!(plan.total_documents(), 15);
        assert!(plan.check().is_ok());
        for doc in DocumentType::iter() {
            assert!(plan.batch_of(doc).is_some(), "{doc} missing from plan");
        }
        assert_eq!(plan.batch_of(DocumentType::Glossary), Some(0));
        assert_eq!(plan.batch_of(DocumentType::StatusUpdates), Some(4));
    }

    #[test]
    fn test_plan_check_rejects_duplicates_and_empty() {
        let dup = BatchPlan::new(vec![
            vec![DocumentType::Readme],
            vec![DocumentType::Readme],
        ]);
        assert!(dup.check().unwrap_err().contains("more than one batch"));
        assert!(BatchPlan::new(vec![]).check().is_err());
        assert!(BatchPlan::new(vec![vec![]]).check().is_err());
    }

    #[test]
    fn test_parse_document_type() {
        assert_eq!(
            "initial_budget".parse::<DocumentType>(),
            Ok(DocumentType::InitialBudget)
        );
        assert_eq!(
            "Initial-Budget.md".parse::<DocumentType>(),
            Ok(DocumentType::InitialBudget)
        );
        assert_eq!("sops".parse::<DocumentType>(), Ok(DocumentType::Sops));
        assert!("charter".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_every_document_has_sections() {
        for doc in DocumentType::iter() {
            assert!(!doc.required_sections().is_empty(), "{doc}");
            assert!(doc.filename().ends_with(".md"));
        }
    }

    #[test]
    fn test_generated_document_counts_words() {
        let doc = GeneratedDocument::success(
            DocumentType::Readme,
            0,
            "# Project Overview\n\nThree more words.".into(),
            ProviderKind::Local,
            false,
        );
        assert_eq!(doc.word_count, 6);
        assert!(doc.succeeded());
        assert_eq!(doc.relative_path(), "00-Overview/README.md");

        let failed = GeneratedDocument::failure(DocumentType::Sops, 3, None, "boom");
        assert!(!failed.succeeded());
        assert!(failed.body.is_empty());
    }
}
