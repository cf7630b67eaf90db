use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use charter_utils::documents::DocumentType;
use charter_utils::types::{AgentDefinition, ProjectInput};
use strum::IntoEnumIterator;

use crate::rules::{AgentTemplate, DOMAIN_RULES, DomainRule};

/// Identifier of the agent that runs for every project.
pub const FRAMEWORKS_AGENT_ID: &str = "agent_000_frameworks";

/// Numbered agent ids start here; the frameworks agent comes first.
const FIRST_AGENT_NUMBER: usize = 2;

/// Word-boundary matchers, one list per rule in [`DOMAIN_RULES`].
static KEYWORD_PATTERNS: Lazy<Vec<Vec<(&'static str, Regex)>>> = Lazy::new(|| {
    DOMAIN_RULES
        .iter()
        .map(|rule| {
            rule.keywords
                .iter()
                .map(|kw| {
                    let pattern = format!(r"\b{}\b", regex::escape(kw));
                    (*kw, Regex::new(&pattern).expect("escaped keyword is a valid regex"))
                })
                .collect()
        })
        .collect()
});

/// A domain detected in the project text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainMatch {
    pub domain: String,
    pub keywords: Vec<String>,
    /// `min(matched keywords / 3, 1)`
    pub confidence: f64,
    pub stakeholders: Vec<String>,
}

/// Match the project text against every domain rule.
///
/// Results are sorted by confidence, highest first; ties keep table order.
#[must_use]
pub fn analyze(input: &ProjectInput) -> Vec<DomainMatch> {
    let text = format!(
        "{} {} {}",
        input.name,
        input.description,
        input.additional_context.as_deref().unwrap_or("")
    )
    .to_lowercase();

    let mut matches: Vec<DomainMatch> = DOMAIN_RULES
        .iter()
        .zip(KEYWORD_PATTERNS.iter())
        .filter_map(|(rule, patterns)| {
            let keywords: Vec<String> = patterns
                .iter()
                .filter(|(_, re)| re.is_match(&text))
                .map(|(kw, _)| (*kw).to_string())
                .collect();
            if keywords.is_empty() {
                return None;
            }
            Some(DomainMatch {
                domain: rule.domain.to_string(),
                confidence: (keywords.len() as f64 / 3.0).min(1.0),
                keywords,
                stakeholders: rule.stakeholders.iter().map(|s| s.to_string()).collect(),
            })
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

/// Derive research agents for a project.
///
/// The frameworks agent always comes first. Each matched domain adds a
/// researcher with no dependencies and an analyst that depends on it.
#[must_use]
pub fn discover(input: &ProjectInput) -> Vec<AgentDefinition> {
    let matches = analyze(input);
    let mut agents = vec![frameworks_agent()];
    let mut number = FIRST_AGENT_NUMBER;

    for domain in &matches {
        let Some(rule) = DOMAIN_RULES.iter().find(|r| r.domain == domain.domain) else {
            continue;
        };

        let researcher_id = format!("agent_{number:03}");
        agents.push(domain_agent(
            input,
            rule,
            &rule.researcher,
            researcher_id.clone(),
            Vec::new(),
        ));
        number += 1;

        agents.push(domain_agent(
            input,
            rule,
            &rule.analyst,
            format!("agent_{number:03}"),
            vec![researcher_id],
        ));
        number += 1;
    }

    debug!(
        domains = matches.len(),
        agents = agents.len(),
        "Agent discovery complete"
    );
    agents
}

fn domain_agent(
    input: &ProjectInput,
    rule: &DomainRule,
    template: &AgentTemplate,
    id: String,
    depends_on: Vec<String>,
) -> AgentDefinition {
    let phrase = rule.phrase();
    let year = Utc::now().year();

    AgentDefinition {
        id,
        name: format!("{} - {}", rule.title(), template.role),
        role: template.role.to_string(),
        purpose: template.focus.to_string(),
        domain_category: rule.domain.to_string(),
        primary_questions: vec![
            format!("What are the key regulations and compliance requirements for {phrase} projects?"),
            format!("What are best practices for {}?", template.focus),
            format!(
                "What stakeholder considerations apply to {}?",
                rule.stakeholders
                    .iter()
                    .take(2)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            format!("What common challenges and solutions exist for {phrase} initiatives?"),
        ],
        search_terms: vec![
            format!("{phrase} {} best practices {year}", template.focus),
            format!("{phrase} compliance requirements"),
            format!("{} {phrase} regulations", input.name),
        ],
        target_documents: template.documents.to_vec(),
        can_parallelize: true,
        depends_on,
    }
}

/// Gathers professional documentation frameworks for every project.
#[must_use]
pub fn frameworks_agent() -> AgentDefinition {
    let year = Utc::now().year();
    AgentDefinition {
        id: FRAMEWORKS_AGENT_ID.to_string(),
        name: "Documentation Frameworks & Professional Standards".to_string(),
        role: "Senior Documentation Architect with 15+ years in nonprofit, tribal, and public sector"
            .to_string(),
        purpose: "Professional frameworks, templates and examples for project documentation"
            .to_string(),
        domain_category: "documentation".to_string(),
        primary_questions: vec![
            "What are the industry-standard frameworks for professional project documentation? (e.g., SMART goals, RACI charts, risk matrices, Gantt conventions)".to_string(),
            "What are best practices and formatting conventions for executive-level project documentation in nonprofit/public sector?".to_string(),
            "What are concrete examples of well-written budget narratives, risk assessments, and SOPs for similar organizations?".to_string(),
            "What are the key differences between junior-level and senior-level project documentation in terms of depth, specificity, and strategic thinking?".to_string(),
            "What professional templates and structures are commonly used for project briefs, stakeholder notes, and status updates?".to_string(),
        ],
        search_terms: vec![
            format!("nonprofit project documentation best practices {year}"),
            "professional project management frameworks SMART goals RACI".to_string(),
            "executive-level budget narrative examples public sector".to_string(),
            "risk assessment matrix templates nonprofit organizations".to_string(),
            "standard operating procedures SOP templates government agencies".to_string(),
            "project timeline Gantt chart best practices".to_string(),
            "stakeholder analysis frameworks project management".to_string(),
            "senior project manager documentation vs junior".to_string(),
        ],
        target_documents: DocumentType::iter().collect(),
        can_parallelize: true,
        depends_on: Vec::new(),
    }
}
