//! The compiled research brief.
//!
//! A brief holds one entry per agent. The narrative view regroups every
//! completed response under six fixed headings so generation prompts read
//! the same way regardless of how each agent formatted its answer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use charter_utils::documents::DocumentType;
use charter_utils::types::AgentDefinition;

/// Fixed narrative headings, in output order.
pub const BRIEF_SECTIONS: [&str; 6] = [
    "Industry and Domain Context",
    "Regulatory Factors",
    "Precedents",
    "Stakeholder Landscape",
    "Risks",
    "Funding and Resources",
];

pub const UNAVAILABLE_SECTION: &str = "Unavailable Research";

/// Keyword fragments that route a heading to a section, checked in order.
const HEADING_ALIASES: &[(usize, &[&str])] = &[
    (3, &["stakeholder"]),
    (1, &["regulat", "compliance", "legal", "policy", "policies"]),
    (5, &["funding", "resource", "budget", "grant"]),
    (4, &["risk", "challenge", "barrier"]),
    (2, &["precedent", "case stud", "comparable", "example"]),
    (0, &["industry", "domain", "context", "background", "key findings", "overview"]),
];

/// What one agent contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentFindings {
    Completed { raw_text: String },
    Unavailable { reason: String },
}

impl AgentFindings {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefEntry {
    pub agent_name: String,
    pub target_documents: Vec<DocumentType>,
    pub findings: AgentFindings,
}

/// One narrative section with per-agent blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefSection {
    pub heading: &'static str,
    /// `(agent name, text)` in agent id order.
    pub blocks: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub entries: BTreeMap<String, BriefEntry>,
}

impl ResearchBrief {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `agent`, replacing any earlier entry.
    pub fn record(&mut self, agent: &AgentDefinition, findings: AgentFindings) {
        self.entries.insert(
            agent.id.clone(),
            BriefEntry {
                agent_name: agent.name.clone(),
                target_documents: agent.target_documents.clone(),
                findings,
            },
        );
    }

    #[must_use]
    pub fn get(&self, agent_id: &str) -> Option<&BriefEntry> {
        self.entries.get(agent_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.findings.is_completed())
            .count()
    }

    #[must_use]
    pub fn unavailable_count(&self) -> usize {
        self.len() - self.completed_count()
    }

    /// Completed responses regrouped under [`BRIEF_SECTIONS`].
    #[must_use]
    pub fn sections(&self) -> Vec<BriefSection> {
        let mut sections: Vec<BriefSection> = BRIEF_SECTIONS
            .into_iter()
            .map(|heading| BriefSection {
                heading,
                blocks: Vec::new(),
            })
            .collect();

        for entry in self.entries.values() {
            if let AgentFindings::Completed { raw_text } = &entry.findings {
                for (index, text) in split_sections(raw_text).into_iter().enumerate() {
                    if !text.is_empty() {
                        sections[index].blocks.push((entry.agent_name.clone(), text));
                    }
                }
            }
        }

        sections
    }

    /// The full brief as markdown.
    #[must_use]
    pub fn narrative(&self) -> String {
        let mut out = String::new();
        for section in self.sections() {
            out.push_str(&format!("## {}\n\n", section.heading));
            if section.blocks.is_empty() {
                out.push_str("_No findings reported._\n\n");
                continue;
            }
            for (agent_name, text) in section.blocks {
                out.push_str(&format!("**{agent_name}:**\n{text}\n\n"));
            }
        }

        let unavailable: Vec<_> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| match &entry.findings {
                AgentFindings::Unavailable { reason } => Some((id, entry, reason)),
                AgentFindings::Completed { .. } => None,
            })
            .collect();
        if !unavailable.is_empty() {
            out.push_str(&format!("## {UNAVAILABLE_SECTION}\n\n"));
            for (id, entry, reason) in unavailable {
                out.push_str(&format!("- {} (`{id}`): {reason}\n", entry.agent_name));
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }

    /// Findings of every agent that feeds `doc`, with unavailable markers.
    ///
    /// Empty when no agent targets the document.
    #[must_use]
    pub fn slice_for(&self, doc: DocumentType) -> String {
        self.entries
            .values()
            .filter(|entry| entry.target_documents.contains(&doc))
            .map(|entry| match &entry.findings {
                AgentFindings::Completed { raw_text } => {
                    format!("### {}\n\n{}", entry.agent_name, raw_text.trim())
                }
                AgentFindings::Unavailable { reason } => {
                    format!(
                        "### {}\n\n_Research unavailable: {reason}_",
                        entry.agent_name
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Split one response into the six sections.
///
/// Text before the first recognised heading belongs to the first section.
/// Unrecognised headings stay in place as text.
pub(crate) fn split_sections(raw: &str) -> [String; 6] {
    let mut sections: [Vec<&str>; 6] = Default::default();
    let mut current = 0;

    for line in raw.lines() {
        match heading_text(line).and_then(classify_heading) {
            Some(index) => current = index,
            None => sections[current].push(line),
        }
    }

    sections.map(|lines| lines.join("\n").trim().to_string())
}

/// The title of a heading-like line: `## X`, `**X**` or `X:` alone.
fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let title = if let Some(rest) = trimmed.strip_prefix('#') {
        rest.trim_start_matches('#').trim()
    } else if trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**") {
        trimmed[2..trimmed.len() - 2].trim().trim_end_matches(':')
    } else if let Some(rest) = trimmed.strip_suffix(':')
        && !rest.starts_with(['-', '*', '•'])
        && rest.split_whitespace().count() <= 5
    {
        rest.trim()
    } else {
        return None;
    };

    let title = title.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
    (!title.is_empty()).then_some(title)
}

fn classify_heading(title: &str) -> Option<usize> {
    let lower = title.to_lowercase();
    if let Some(index) = BRIEF_SECTIONS
        .iter()
        .position(|s| s.to_lowercase() == lower)
    {
        return Some(index);
    }
    HEADING_ALIASES
        .iter()
        .find(|(_, fragments)| fragments.iter().any(|f| lower.contains(f)))
        .map(|(index, _)| *index)
}
