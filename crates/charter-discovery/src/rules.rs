//! Domain rule table.
//!
//! Each rule pairs a keyword predicate with two agent templates: a
//! researcher that gathers regulations and context, and an analyst that
//! builds on the researcher's findings.

use charter_utils::documents::DocumentType::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTemplate {
    pub role: &'static str,
    pub focus: &'static str,
    pub documents: &'static [DocumentType],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainRule {
    pub domain: &'static str,
    pub keywords: &'static [&'static str],
    pub stakeholders: &'static [&'static str],
    pub researcher: AgentTemplate,
    pub analyst: AgentTemplate,
}

impl DomainRule {
    /// "tribal_governance" → "Tribal Governance"
    #[must_use]
    pub fn title(&self) -> String {
        self.domain
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// "tribal_governance" → "tribal governance"
    #[must_use]
    pub fn phrase(&self) -> String {
        self.domain.replace('_', " ")
    }
}

pub static DOMAIN_RULES: &[DomainRule] = &[
    DomainRule {
        domain: "healthcare",
        keywords: &[
            "health",
            "medical",
            "clinic",
            "hospital",
            "patient",
            "hipaa",
            "phi",
            "treatment",
            "diagnosis",
            "wellness",
            "telehealth",
            "ihs",
            "indian health service",
        ],
        stakeholders: &["patients", "healthcare providers", "administrators", "regulators"],
        researcher: AgentTemplate {
            role: "Healthcare Compliance Researcher",
            focus: "HIPAA, IHS regulations, tribal health sovereignty",
            documents: &[ContextBackground, ScopeBoundaries, RisksAssumptions, Sops],
        },
        analyst: AgentTemplate {
            role: "Healthcare Best Practices Analyst",
            focus: "Clinical workflows, patient safety, quality metrics",
            documents: &[GoalsSuccess, ProcessWorkflow, Sops, TaskBacklog],
        },
    },
    DomainRule {
        domain: "education",
        keywords: &[
            "school",
            "education",
            "student",
            "teacher",
            "curriculum",
            "learning",
            "training",
            "workshop",
            "tribal college",
            "bie",
            "ferpa",
        ],
        stakeholders: &[
            "students",
            "educators",
            "administrators",
            "parents",
            "tribal education dept",
        ],
        researcher: AgentTemplate {
            role: "Education Policy Researcher",
            focus: "FERPA, BIE requirements, tribal education sovereignty",
            documents: &[ContextBackground, ScopeBoundaries, RisksAssumptions],
        },
        analyst: AgentTemplate {
            role: "Curriculum Development Analyst",
            focus: "Best practices, cultural integration, assessment methods",
            documents: &[GoalsSuccess, ProcessWorkflow, TaskBacklog],
        },
    },
    DomainRule {
        domain: "tribal_governance",
        keywords: &[
            "tribe",
            "tribal",
            "sovereignty",
            "nation",
            "council",
            "reservation",
            "treaty",
            "self-governance",
            "self-determination",
            "bia",
        ],
        stakeholders: &[
            "tribal council",
            "tribal members",
            "federal agencies",
            "state agencies",
        ],
        researcher: AgentTemplate {
            role: "Tribal Policy Researcher",
            focus: "Federal Indian law, sovereignty principles, treaty rights",
            documents: &[ContextBackground, StakeholderNotes, RisksAssumptions],
        },
        analyst: AgentTemplate {
            role: "Governance Best Practices Analyst",
            focus: "Self-governance models, administrative procedures",
            documents: &[ProcessWorkflow, Sops, MeetingNotes],
        },
    },
    DomainRule {
        domain: "grants_funding",
        keywords: &[
            "grant",
            "funding",
            "budget",
            "proposal",
            "funder",
            "foundation",
            "federal grant",
            "state grant",
            "nonprofit",
        ],
        stakeholders: &[
            "funders",
            "grant administrators",
            "program staff",
            "finance team",
        ],
        researcher: AgentTemplate {
            role: "Grants Researcher",
            focus: "Funding opportunities, eligibility requirements, deadlines",
            documents: &[InitialBudget, TimelineMilestones, ContextBackground],
        },
        analyst: AgentTemplate {
            role: "Proposal Best Practices Analyst",
            focus: "Successful proposal strategies, compliance requirements",
            documents: &[ProjectBrief, InitialBudget, StatusUpdates],
        },
    },
    DomainRule {
        domain: "technology",
        keywords: &[
            "software",
            "app",
            "application",
            "system",
            "database",
            "api",
            "cloud",
            "infrastructure",
            "cybersecurity",
            "data",
        ],
        stakeholders: &["developers", "IT staff", "end users", "security team"],
        researcher: AgentTemplate {
            role: "Technology Standards Researcher",
            focus: "Industry standards, security requirements, compliance",
            documents: &[ScopeBoundaries, RisksAssumptions, Sops],
        },
        analyst: AgentTemplate {
            role: "Technical Architecture Analyst",
            focus: "Best practices, scalability, maintainability",
            documents: &[ProcessWorkflow, TaskBacklog, TimelineMilestones],
        },
    },
    DomainRule {
        domain: "rural_community",
        keywords: &[
            "rural",
            "remote",
            "community",
            "village",
            "broadband",
            "connectivity",
            "infrastructure",
            "transportation",
        ],
        stakeholders: &[
            "community members",
            "local government",
            "service providers",
        ],
        researcher: AgentTemplate {
            role: "Rural Development Researcher",
            focus: "USDA programs, connectivity initiatives, infrastructure grants",
            documents: &[ContextBackground, InitialBudget, StakeholderNotes],
        },
        analyst: AgentTemplate {
            role: "Community Needs Analyst",
            focus: "Best practices for rural service delivery",
            documents: &[GoalsSuccess, StakeholderNotes, ProcessWorkflow],
        },
    },
];
