use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use charter_utils::documents::{BatchPlan, DocumentType, GeneratedDocument};

use crate::report::QualityIssue;
use crate::vocabulary::COMMON_ACRONYMS;

const MAX_ACRONYMS_PER_DOCUMENT: usize = 5;

static BOLD_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]{2,80})\*\*").expect("valid regex"));
static H3_TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^###\s+(.+?)\s*$").expect("valid regex"));
static GROUP_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{2,3}\s+(.+?)\s*$").expect("valid regex"));
static ACRONYM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").expect("valid regex"));
static DOLLARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?").expect("valid regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

/// Successful documents keyed by type.
pub(crate) type DocumentIndex<'a> = HashMap<DocumentType, &'a GeneratedDocument>;

pub(crate) fn index(documents: &[Arc<GeneratedDocument>]) -> DocumentIndex<'_> {
    documents
        .iter()
        .filter(|d| d.succeeded())
        .map(|d| (d.doc_type, d.as_ref()))
        .collect()
}

/// Bodies of every successful document except `skip`, lowercased.
fn other_bodies(index: &DocumentIndex<'_>, skip: DocumentType) -> Vec<String> {
    index
        .values()
        .filter(|d| d.doc_type != skip)
        .map(|d| d.body.to_lowercase())
        .collect()
}

fn strip_term(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// Terms defined by the glossary as `**Term**` or `### Term` entries.
pub(crate) fn glossary_terms(glossary: &str) -> BTreeSet<String> {
    BOLD_TERM
        .captures_iter(glossary)
        .chain(H3_TERM.captures_iter(glossary))
        .map(|c| strip_term(&c[1]))
        .filter(|t| t.chars().count() >= 2)
        .collect()
}

pub(crate) fn unused_glossary_terms(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let Some(glossary) = index.get(&DocumentType::Glossary) else {
        return Vec::new();
    };
    let others = other_bodies(index, DocumentType::Glossary);
    if others.is_empty() {
        return Vec::new();
    }

    let unused: Vec<String> = glossary_terms(&glossary.body)
        .into_iter()
        .filter(|term| {
            let needle = term.to_lowercase();
            !others.iter().any(|body| body.contains(&needle))
        })
        .collect();

    if unused.is_empty() {
        return Vec::new();
    }
    vec![
        QualityIssue::info(
            vec![DocumentType::Glossary],
            format!(
                "{} glossary term(s) are not used in any other document: {}",
                unused.len(),
                unused.join(", ")
            ),
        )
        .suggest("Remove unused entries or reference them where relevant"),
    ]
}

pub(crate) fn undefined_acronyms(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let Some(glossary) = index.get(&DocumentType::Glossary) else {
        return Vec::new();
    };
    let defined: BTreeSet<&str> = ACRONYM
        .find_iter(&glossary.body)
        .map(|m| m.as_str())
        .collect();

    let mut issues = Vec::new();
    let mut docs: Vec<&&GeneratedDocument> = index.values().collect();
    docs.sort_by_key(|d| d.doc_type);

    for doc in docs {
        if doc.doc_type == DocumentType::Glossary {
            continue;
        }
        let undefined: BTreeSet<&str> = ACRONYM
            .find_iter(&doc.body)
            .map(|m| m.as_str())
            .filter(|a| !defined.contains(a) && !COMMON_ACRONYMS.contains(a))
            .collect();
        if undefined.is_empty() {
            continue;
        }
        let shown: Vec<&str> = undefined
            .iter()
            .take(MAX_ACRONYMS_PER_DOCUMENT)
            .copied()
            .collect();
        issues.push(
            QualityIssue::info(
                vec![doc.doc_type, DocumentType::Glossary],
                format!(
                    "{} uses acronyms the glossary does not define: {}",
                    doc.title,
                    shown.join(", ")
                ),
            )
            .suggest("Add these acronyms to the glossary"),
        );
    }
    issues
}

fn normalize_heading(title: &str) -> String {
    title
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ')
        .trim()
        .to_lowercase()
}

pub(crate) fn missing_required_headings(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let mut docs: Vec<&&GeneratedDocument> = index.values().collect();
    docs.sort_by_key(|d| d.doc_type);

    docs.into_iter()
        .filter_map(|doc| {
            let headings: Vec<String> = doc
                .body
                .lines()
                .filter_map(|l| l.trim().strip_prefix("## "))
                .map(normalize_heading)
                .collect();
            let missing: Vec<&str> = doc
                .doc_type
                .required_sections()
                .iter()
                .copied()
                .filter(|required| {
                    let required = required.to_lowercase();
                    !headings.iter().any(|h| h.contains(&required))
                })
                .collect();
            (!missing.is_empty()).then(|| {
                QualityIssue::warning(
                    vec![doc.doc_type],
                    format!(
                        "{} is missing required sections: {}",
                        doc.title,
                        missing.join(", ")
                    ),
                )
                .suggest("Regenerate the document or add the sections")
            })
        })
        .collect()
}

fn dollar_amounts(line: &str) -> Vec<u64> {
    DOLLARS
        .captures_iter(line)
        .filter_map(|c| c[1].replace(',', "").parse().ok())
        .collect()
}

pub(crate) fn budget_totals(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let Some(budget) = index.get(&DocumentType::InitialBudget) else {
        return Vec::new();
    };
    let totals: BTreeSet<u64> = budget
        .body
        .lines()
        .filter(|l| l.to_lowercase().contains("total"))
        .flat_map(dollar_amounts)
        .collect();
    if totals.is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();
    for quoting in [DocumentType::ProjectBrief, DocumentType::StatusUpdates] {
        let Some(doc) = index.get(&quoting) else {
            continue;
        };
        let mismatched: BTreeSet<u64> = doc
            .body
            .lines()
            .filter(|l| {
                let lower = l.to_lowercase();
                lower.contains("total") && lower.contains("budget")
            })
            .flat_map(dollar_amounts)
            .filter(|amount| !totals.contains(amount))
            .collect();
        if mismatched.is_empty() {
            continue;
        }
        issues.push(
            QualityIssue::warning(
                vec![DocumentType::InitialBudget, quoting],
                format!(
                    "{} quotes total budget figures not found in the Initial Budget: {}",
                    doc.title,
                    mismatched
                        .iter()
                        .map(|a| format!("${}", group_thousands(*a)))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
            .suggest("Align the figure with the Initial Budget totals"),
        );
    }
    issues
}

fn group_thousands(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn years(body: &str) -> BTreeSet<u32> {
    YEAR.find_iter(body)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

pub(crate) fn timeline_years(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let Some(timeline) = index.get(&DocumentType::TimelineMilestones) else {
        return Vec::new();
    };
    let span = years(&timeline.body);
    let (Some(&first), Some(&last)) = (span.first(), span.last()) else {
        return Vec::new();
    };

    let planning = [
        DocumentType::GoalsSuccess,
        DocumentType::ScopeBoundaries,
        DocumentType::InitialBudget,
        DocumentType::RisksAssumptions,
    ];
    planning
        .into_iter()
        .filter_map(|doc_type| index.get(&doc_type))
        .filter_map(|doc| {
            let outside: Vec<String> = years(&doc.body)
                .into_iter()
                .filter(|y| *y < first || *y > last)
                .map(|y| y.to_string())
                .collect();
            (!outside.is_empty()).then(|| {
                QualityIssue::warning(
                    vec![doc.doc_type, DocumentType::TimelineMilestones],
                    format!(
                        "{} mentions years outside the timeline ({first}-{last}): {}",
                        doc.title,
                        outside.join(", ")
                    ),
                )
                .suggest("Check dates against Timeline and Milestones")
            })
        })
        .collect()
}

pub(crate) fn stakeholder_consistency(index: &DocumentIndex<'_>) -> Vec<QualityIssue> {
    let Some(notes) = index.get(&DocumentType::StakeholderNotes) else {
        return Vec::new();
    };
    let structural: Vec<String> = DocumentType::StakeholderNotes
        .required_sections()
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let groups: Vec<String> = GROUP_HEADING
        .captures_iter(&notes.body)
        .map(|c| {
            let title = normalize_heading(&c[1]);
            // "Tribal Council (Decision Makers)" is mentioned as "tribal council".
            match title.split_once('(') {
                Some((head, _)) => head.trim().to_string(),
                None => title,
            }
        })
        .filter(|g| !g.is_empty() && !structural.contains(g))
        .collect();

    if groups.is_empty() {
        return vec![
            QualityIssue::warning(
                vec![DocumentType::StakeholderNotes],
                "Stakeholder Notes identifies no stakeholder groups",
            )
            .suggest("Add one ## or ### heading per stakeholder group"),
        ];
    }

    let others = other_bodies(index, DocumentType::StakeholderNotes);
    if others.is_empty() {
        return Vec::new();
    }
    let unmentioned: Vec<String> = groups
        .into_iter()
        .filter(|g| !others.iter().any(|body| body.contains(g.as_str())))
        .collect();
    if unmentioned.is_empty() {
        return Vec::new();
    }
    vec![
        QualityIssue::info(
            vec![DocumentType::StakeholderNotes],
            format!(
                "Stakeholder groups never mentioned elsewhere: {}",
                unmentioned.join(", ")
            ),
        )
        .suggest("Reference these groups in planning and communication documents"),
    ]
}

pub(crate) fn completeness(
    documents: &[Arc<GeneratedDocument>],
    plan: &BatchPlan,
) -> Vec<QualityIssue> {
    let mut missing = Vec::new();
    let mut failed = Vec::new();
    for expected in plan.documents() {
        match documents.iter().find(|d| d.doc_type == expected) {
            None => missing.push(expected),
            Some(d) if !d.succeeded() => failed.push(expected),
            Some(_) => {}
        }
    }
    if missing.is_empty() && failed.is_empty() {
        return Vec::new();
    }

    let names = |docs: &[DocumentType]| {
        docs.iter()
            .map(|d| d.title())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing: {}", names(&missing)));
    }
    if !failed.is_empty() {
        parts.push(format!("failed: {}", names(&failed)));
    }
    let mut affected = missing;
    affected.extend(failed);
    vec![
        QualityIssue::warning(
            affected,
            format!("Document set is incomplete ({})", parts.join("; ")),
        )
        .suggest("Regenerate the affected documents"),
    ]
}
