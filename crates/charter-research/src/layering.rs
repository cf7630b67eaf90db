use charter_discovery::dependency_layers;
use charter_utils::error::PhaseError;
use charter_utils::types::AgentDefinition;

/// Execution batches as indices into `agents`.
///
/// Each dependency layer yields one batch of its parallelizable agents,
/// followed by one single-agent batch per non-parallelizable agent.
pub fn plan_batches(agents: &[AgentDefinition]) -> Result<Vec<Vec<usize>>, PhaseError> {
    let mut batches = Vec::new();
    for layer in dependency_layers(agents)? {
        let (parallel, serial): (Vec<usize>, Vec<usize>) =
            layer.into_iter().partition(|&i| agents[i].can_parallelize);
        if !parallel.is_empty() {
            batches.push(parallel);
        }
        batches.extend(serial.into_iter().map(|i| vec![i]));
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn agent(id: &str, deps: &[&str], parallel: bool) -> AgentDefinition {
        AgentDefinition {
            id: id.to_string(),
            name: id.to_string(),
            role: "Researcher".to_string(),
            purpose: String::new(),
            domain_category: "general".to_string(),
            primary_questions: vec![],
            search_terms: vec![],
            target_documents: vec![],
            can_parallelize: parallel,
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_parallel_agents_share_first_batch() {
        let agents = vec![
            agent("a", &[], true),
            agent("b", &[], true),
            agent("c", &["a"], true),
        ];
        assert_eq!(plan_batches(&agents).unwrap(), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_serial_agents_run_alone_after_parallel_ones() {
        let agents = vec![
            agent("a", &[], false),
            agent("b", &[], true),
            agent("c", &[], false),
            agent("d", &["b"], true),
        ];
        assert_eq!(
            plan_batches(&agents).unwrap(),
            vec![vec![1], vec![0], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let agents = vec![agent("a", &["b"], true), agent("b", &["a"], true)];
        assert!(matches!(
            plan_batches(&agents),
            Err(PhaseError::InvalidAgentGraph(_))
        ));
    }

    #[test]
    fn test_empty_input_has_no_batches() {
        assert!(plan_batches(&[]).unwrap().is_empty());
    }

    /// Random DAGs: agent `i` may only depend on agents `< i`.
    fn arb_agents() -> impl Strategy<Value = Vec<AgentDefinition>> {
        prop::collection::vec((any::<bool>(), prop::collection::vec(any::<prop::sample::Index>(), 0..3)), 1..12)
            .prop_map(|specs| {
                specs
                    .iter()
                    .enumerate()
                    .map(|(i, (parallel, deps))| {
                        let mut dep_ids: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            deps.iter().map(|d| format!("a{}", d.index(i))).collect()
                        };
                        dep_ids.sort();
                        dep_ids.dedup();
                        let refs: Vec<&str> = dep_ids.iter().map(String::as_str).collect();
                        agent(&format!("a{i}"), &refs, *parallel)
                    })
                    .collect()
            })
    }

    proptest! {
        /// **Property: every agent runs exactly once, after all its dependencies**
        #[test]
        fn prop_batches_respect_dependencies(agents in arb_agents()) {
            let batches = plan_batches(&agents).unwrap();

            let mut batch_of: HashMap<&str, usize> = HashMap::new();
            for (b, batch) in batches.iter().enumerate() {
                for &i in batch {
                    prop_assert!(batch_of.insert(agents[i].id.as_str(), b).is_none());
                }
            }
            prop_assert_eq!(batch_of.len(), agents.len());

            for a in &agents {
                for dep in &a.depends_on {
                    prop_assert!(batch_of[dep.as_str()] < batch_of[a.id.as_str()]);
                }
                if !a.can_parallelize {
                    let b = batch_of[a.id.as_str()];
                    prop_assert_eq!(batches[b].len(), 1);
                }
            }
        }
    }
}
