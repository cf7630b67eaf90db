//! Research agent discovery.
//!
//! Discovery is a pure function of the project text: a fixed rule table of
//! keyword predicates and agent templates. It makes no provider calls.

mod discovery;
mod graph;
mod rules;

pub use discovery::{DomainMatch, FRAMEWORKS_AGENT_ID, analyze, discover, frameworks_agent};
pub use graph::{dependency_layers, validate_graph};
pub use rules::{AgentTemplate, DOMAIN_RULES, DomainRule};
