use charter_discovery::FRAMEWORKS_AGENT_ID;
use charter_utils::types::AgentDefinition;

use crate::brief::BRIEF_SECTIONS;

/// Prompt sent to the research provider for one agent.
pub fn build_research_prompt(agent: &AgentDefinition, project_context: &str) -> String {
    if agent.id == FRAMEWORKS_AGENT_ID {
        return build_frameworks_prompt(agent, project_context);
    }

    let mut prompt = format!(
        "You are a {role} conducting research for a project.\n\n\
         ## Project Context\n{project_context}\n\n\
         ## Your Research Focus\n{role}: {purpose}\n\n\
         ## Research Questions to Answer\n{questions}\n\n\
         ## Suggested Search Queries\n{queries}\n\n\
         ## Instructions\n\
         1. Search the web for current, relevant information\n\
         2. Focus on authoritative sources (government, academic, industry standards)\n\
         3. Provide specific, actionable findings\n\
         4. Include source URLs for all findings\n\
         5. Make recommendations based on your research\n\n",
        role = agent.role,
        purpose = agent.purpose,
        questions = bullet_list(&agent.primary_questions),
        queries = bullet_list(&agent.search_terms),
    );
    prompt.push_str(&output_format());
    prompt
}

fn build_frameworks_prompt(agent: &AgentDefinition, project_context: &str) -> String {
    let mut prompt = format!(
        "You are a {role} conducting research to provide professional documentation frameworks.\n\n\
         ## Mission\n\
         Your research will be used by a writing model that has no web access.\n\
         Gather enough professional scaffolding for it to produce senior-level documentation.\n\n\
         ## Project Context\n{project_context}\n\n\
         ## Research Questions to Answer\n{questions}\n\n\
         ## Suggested Search Queries\n{queries}\n\n\
         ## Critical Requirements\n\n\
         Your findings must include concrete, specific information in these categories:\n\n\
         ### 1. Professional Frameworks\n\
         - SMART goals framework (specific criteria and examples)\n\
         - RACI matrix structure and usage guidelines\n\
         - Risk assessment matrices (likelihood x impact scales)\n\
         - Timeline and milestone conventions\n\
         - Stakeholder analysis frameworks (power/interest grid)\n\
         - Budget categories and narrative structures for nonprofits\n\n\
         ### 2. Document Structure Templates\n\
         For each document type (budget, risk assessment, SOPs, timeline):\n\
         - Standard section headings used by professionals\n\
         - Typical subsections and what information goes where\n\n\
         ### 3. Concrete Examples\n\
         - Well-written budget narratives\n\
         - Risk statements with mitigation strategies\n\
         - Effective SOP formats and language\n\
         - Executive-level status updates\n\n\
         ### 4. Depth and Sophistication Markers\n\
         What distinguishes senior-level from junior-level documentation: strategic \
         framing, depth of justification, cross-referencing, anticipation of concerns \
         and use of evidence.\n\n\
         ## Instructions\n\
         1. Search extensively; this research is foundational for every document\n\
         2. Prioritize authoritative sources (PMI, government style guides, academic)\n\
         3. Extract specific details, not general principles\n\
         4. Include actual examples and concrete templates\n\
         5. Focus on nonprofit, tribal and public sector contexts\n\n",
        role = agent.role,
        questions = bullet_list(&agent.primary_questions),
        queries = bullet_list(&agent.search_terms),
    );
    prompt.push_str(&output_format());
    prompt
}

/// Output headings every research response is asked to use.
fn output_format() -> String {
    let mut out = String::from(
        "## Output Format\n\
         Organize your findings under these exact headings. Omit a heading only when \
         you found nothing for it.\n\n",
    );
    for heading in BRIEF_SECTIONS {
        out.push_str("### ");
        out.push_str(heading);
        out.push('\n');
    }
    out.push_str("### Sources\n");
    out.push_str("\nList source URLs under each finding or in the Sources section.\n");
    out
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none provided)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
