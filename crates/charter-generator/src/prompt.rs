use std::sync::Arc;

use charter_utils::documents::{DocumentType, GeneratedDocument};

/// Style rules appended to every generation prompt.
pub const WRITING_STYLE_RULES: &str = "\
### WRITING STYLE

**Punctuation:**
- Avoid em dashes. Use commas, parentheses or separate sentences instead.

**Banned vocabulary:**
- delve, tapestry, realm, vibrant, bustling, harness
- leverage (use \"use\" or \"apply\"), utilize (use \"use\")
- seamlessly, meticulous, intricate, pivotal
- underscore, embark, navigate, landscape, foster
- cutting-edge (use \"modern\" or \"new\")
- holistic, synergy, synergistic, paradigm

**Transitions:** avoid formulaic transitions such as Furthermore, Moreover, \
In addition, Additionally, Firstly, Secondly, In conclusion and To summarize.

**Openings:** never open a document or section with \"In today's...\", \
\"In an era of...\" or \"In the ever-evolving landscape...\". Start with a \
specific fact or a direct statement.
";

/// The persona the writer is asked to adopt for `doc`.
fn expert_role(doc: DocumentType) -> &'static str {
    match doc {
        DocumentType::Readme => "a technical writer who produces clear project landing pages",
        DocumentType::ProjectBrief => "a senior program officer who writes executive project briefs",
        DocumentType::Glossary => "a documentation editor who maintains project glossaries",
        DocumentType::ContextBackground => "a senior policy analyst who writes background studies",
        DocumentType::StakeholderNotes => "a senior engagement strategist who maps stakeholders",
        DocumentType::GoalsSuccess => "a senior evaluation specialist who designs SMART goals and KPIs",
        DocumentType::ScopeBoundaries => "a senior project manager who defines project scope",
        DocumentType::InitialBudget => "a senior grants financial analyst who writes budget narratives",
        DocumentType::TimelineMilestones => "a senior project scheduler who builds milestone plans",
        DocumentType::RisksAssumptions => "a senior risk management analyst who uses likelihood and impact matrices",
        DocumentType::ProcessWorkflow => "a senior operations analyst who documents workflows",
        DocumentType::Sops => "a senior operations manager who writes standard operating procedures",
        DocumentType::TaskBacklog => "a senior delivery lead who maintains prioritized backlogs",
        DocumentType::MeetingNotes => "an experienced project coordinator who writes meeting templates",
        DocumentType::StatusUpdates => "a senior program manager who reports status to executives",
    }
}

/// Prompt for one document.
///
/// `research` is the brief slice for `doc`; `previous` holds the successful
/// documents of strictly earlier batches.
pub fn build_generation_prompt(
    doc: DocumentType,
    project_context: &str,
    research: &str,
    previous: &[Arc<GeneratedDocument>],
) -> String {
    let title = doc.title();
    let research = if research.trim().is_empty() {
        "No research findings specific to this document."
    } else {
        research
    };
    let previous = previous_context(previous);
    let required = doc
        .required_sections()
        .iter()
        .map(|s| format!("- ## {s}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are {role}, writing a professional project planning document for a real organization.

## DOCUMENT TO WRITE
{title}

## PROJECT CONTEXT
{project_context}

## RESEARCH FINDINGS
{research}

## PREVIOUS DOCUMENTS (for consistency)
{previous}

## STRICT RULES (you must follow all of these)

1. **Format:** Write in Markdown only
2. **Start with:** an H1 heading (# {title})
3. **Tone:** professional, clear, neutral language suitable for nonprofit, tribal or public-sector organizations
4. **Structure:** H2 headings (##) for sections and H3 headings (###) for subsections
5. **Consistency:** align with the previous documents; do not contradict earlier assumptions, scope or constraints
6. **Research Integration:** reference relevant findings from the research section where applicable

## CONSTRAINTS (do not violate these)

1. **DO NOT invent:** technologies, vendor names, product names or software platforms unless they appear in the research findings
2. **DO NOT fabricate:** statistics, dollar amounts, grant names or funding sources unless provided in the project context
3. **DO NOT add:** stakeholders, team members or partners not mentioned in the project context or previous documents
4. **DO NOT include:** marketing language, sales pitches or promotional content
5. **DO NOT contradict:** information from previous documents

{style}
## REQUIRED SECTIONS

Include each of these H2 sections, in this order:
{required}

## OUTPUT FORMAT

Provide ONLY the Markdown document content, starting with: # {title}

Write the complete document now.
",
        role = expert_role(doc),
        style = WRITING_STYLE_RULES,
    )
}

fn previous_context(previous: &[Arc<GeneratedDocument>]) -> String {
    if previous.is_empty() {
        return "No previous documents.".to_string();
    }
    previous
        .iter()
        .map(|d| format!("### {} ({})\n\n{}", d.title, d.relative_path(), d.body.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
