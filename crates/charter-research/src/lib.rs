//! Research phase: layered agent execution and brief compilation.
//!
//! [`ResearchCoordinator::execute`] runs discovered agents batch by batch
//! against the web-search-capable provider and compiles a [`ResearchBrief`].

mod brief;
mod coordinator;
mod layering;
mod prompt;

pub use brief::{
    AgentFindings, BRIEF_SECTIONS, BriefEntry, BriefSection, ResearchBrief, UNAVAILABLE_SECTION,
};
pub use coordinator::ResearchCoordinator;
pub use layering::plan_batches;
pub use prompt::build_research_prompt;
