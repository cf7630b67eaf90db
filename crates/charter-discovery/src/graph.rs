use std::collections::{HashMap, HashSet};

use charter_utils::error::PhaseError;
use charter_utils::types::AgentDefinition;

/// Topological layers of `agents`, as indices into the slice.
///
/// Layer 0 holds every agent without dependencies; layer k holds the agents
/// whose dependencies all sit in layers below k. Order within a layer follows
/// the input order.
///
/// # Errors
///
/// `PhaseError::InvalidAgentGraph` for duplicate ids, unknown dependencies
/// or cycles.
pub fn dependency_layers(agents: &[AgentDefinition]) -> Result<Vec<Vec<usize>>, PhaseError> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(agents.len());
    for (i, agent) in agents.iter().enumerate() {
        if index_of.insert(agent.id.as_str(), i).is_some() {
            return Err(PhaseError::InvalidAgentGraph(format!(
                "duplicate agent id '{}'",
                agent.id
            )));
        }
    }

    for agent in agents {
        for dep in &agent.depends_on {
            if !index_of.contains_key(dep.as_str()) {
                return Err(PhaseError::InvalidAgentGraph(format!(
                    "agent '{}' depends on unknown agent '{dep}'",
                    agent.id
                )));
            }
            if dep == &agent.id {
                return Err(PhaseError::InvalidAgentGraph(format!(
                    "agent '{}' depends on itself",
                    agent.id
                )));
            }
        }
    }

    let mut placed: HashSet<&str> = HashSet::with_capacity(agents.len());
    let mut layers = Vec::new();

    while placed.len() < agents.len() {
        let layer: Vec<usize> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| !placed.contains(a.id.as_str()))
            .filter(|(_, a)| a.depends_on.iter().all(|d| placed.contains(d.as_str())))
            .map(|(i, _)| i)
            .collect();

        if layer.is_empty() {
            let mut stuck: Vec<&str> = agents
                .iter()
                .map(|a| a.id.as_str())
                .filter(|id| !placed.contains(id))
                .collect();
            stuck.sort_unstable();
            return Err(PhaseError::InvalidAgentGraph(format!(
                "dependency cycle among: {}",
                stuck.join(", ")
            )));
        }

        for &i in &layer {
            placed.insert(agents[i].id.as_str());
        }
        layers.push(layer);
    }

    Ok(layers)
}

/// Check that `agents` form a valid dependency graph.
pub fn validate_graph(agents: &[AgentDefinition]) -> Result<(), PhaseError> {
    dependency_layers(agents).map(|_| ())
}
