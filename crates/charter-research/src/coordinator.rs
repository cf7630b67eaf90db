use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use charter_config::RunSettings;
use charter_llm::{GenerationParams, ProviderSelector, generate_with_timeout};
use charter_utils::error::{LlmError, PhaseError};
use charter_utils::types::{AgentDefinition, ProjectPhase, RunId};

use crate::brief::{AgentFindings, ResearchBrief};
use crate::layering::plan_batches;
use crate::prompt::build_research_prompt;

/// Outcome of one agent call, as seen by the batch loop.
struct AgentOutcome {
    index: usize,
    result: Result<String, LlmError>,
    elapsed: Duration,
}

/// Runs research agents in dependency order against the research provider.
pub struct ResearchCoordinator {
    selector: Arc<ProviderSelector>,
}

impl ResearchCoordinator {
    #[must_use]
    pub fn new(selector: Arc<ProviderSelector>) -> Self {
        Self { selector }
    }

    /// Execute every agent and compile the brief.
    ///
    /// Batches are separated by a barrier; within a batch at most
    /// `settings.research_concurrency` calls are in flight. The research
    /// provider is selected for each call. A failed agent is recorded as
    /// unavailable. The phase fails when every agent of the first batch fails,
    /// when the research provider is misconfigured, or when `cancel` is
    /// observed between batches.
    pub async fn execute(
        &self,
        run_id: &RunId,
        agents: &[AgentDefinition],
        project_context: &str,
        settings: &RunSettings,
        cancel: &AtomicBool,
    ) -> Result<ResearchBrief, PhaseError> {
        let batches = plan_batches(agents)?;
        let mut brief = ResearchBrief::new();
        if batches.is_empty() {
            return Ok(brief);
        }

        let params = GenerationParams::new(settings.research_max_tokens, settings.research_temperature);
        let timeout = settings.research_call_timeout;
        let semaphore = Arc::new(Semaphore::new(settings.research_concurrency.max(1)));

        for (ordinal, batch) in batches.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                info!(run_id = %run_id, batch = ordinal, "Research cancelled between batches");
                return Err(PhaseError::Cancelled {
                    phase: ProjectPhase::Researching,
                });
            }

            debug!(run_id = %run_id, batch = ordinal, agents = batch.len(), "Starting research batch");

            let outcomes = run_batch(
                batch,
                agents,
                project_context,
                run_id,
                Arc::clone(&self.selector),
                Arc::clone(&semaphore),
                params,
                timeout,
            )
            .await;

            let mut succeeded = 0usize;
            let mut last_error = String::new();
            for outcome in outcomes {
                let agent = &agents[outcome.index];
                let elapsed_ms = outcome.elapsed.as_millis();
                match outcome.result {
                    Ok(raw_text) => {
                        succeeded += 1;
                        info!(
                            run_id = %run_id,
                            agent_id = %agent.id,
                            elapsed_ms = %elapsed_ms,
                            "Research agent completed"
                        );
                        brief.record(agent, AgentFindings::Completed { raw_text });
                    }
                    Err(err @ LlmError::Misconfiguration(_)) => return Err(err.into()),
                    Err(err) => {
                        warn!(
                            run_id = %run_id,
                            agent_id = %agent.id,
                            elapsed_ms = %elapsed_ms,
                            error = %err,
                            "Research agent failed"
                        );
                        last_error = err.to_string();
                        brief.record(
                            agent,
                            AgentFindings::Unavailable {
                                reason: last_error.clone(),
                            },
                        );
                    }
                }
            }

            if ordinal == 0 && succeeded == 0 {
                return Err(PhaseError::AgentBatchExhausted {
                    failed: batch.len(),
                    reason: last_error,
                });
            }
        }

        info!(
            run_id = %run_id,
            completed = brief.completed_count(),
            unavailable = brief.unavailable_count(),
            "Research brief compiled"
        );
        Ok(brief)
    }
}

/// Run one batch to completion. Every index in `batch` yields an outcome.
async fn run_batch(
    batch: &[usize],
    agents: &[AgentDefinition],
    project_context: &str,
    run_id: &RunId,
    selector: Arc<ProviderSelector>,
    semaphore: Arc<Semaphore>,
    params: GenerationParams,
    timeout: Duration,
) -> Vec<AgentOutcome> {
    let mut set = JoinSet::new();
    let mut task_index = HashMap::with_capacity(batch.len());

    for &index in batch {
        let prompt = build_research_prompt(&agents[index], project_context);
        let run_id = run_id.clone();
        let selector = Arc::clone(&selector);
        let semaphore = Arc::clone(&semaphore);
        let handle = set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return AgentOutcome {
                    index,
                    result: Err(LlmError::ProviderUnavailable(
                        "research scheduler closed".to_string(),
                    )),
                    elapsed: Duration::ZERO,
                };
            };
            let started = Instant::now();
            let result = match selector.select_for_research(&run_id) {
                Ok(selected) => {
                    generate_with_timeout(selected.client.as_ref(), &prompt, params, timeout).await
                }
                Err(err) => Err(err),
            };
            AgentOutcome {
                index,
                result,
                elapsed: started.elapsed(),
            }
        });
        task_index.insert(handle.id(), index);
    }

    let mut outcomes = Vec::with_capacity(batch.len());
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((_, outcome)) => outcomes.push(outcome),
            Err(join_err) => {
                let Some(&index) = task_index.get(&join_err.id()) else {
                    continue;
                };
                outcomes.push(AgentOutcome {
                    index,
                    result: Err(LlmError::ProviderUnavailable(format!(
                        "research task aborted: {join_err}"
                    ))),
                    elapsed: Duration::ZERO,
                });
            }
        }
    }
    outcomes.sort_by_key(|o| o.index);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use charter_config::{Config, RunOverrides};
    use charter_discovery::{discover, frameworks_agent};
    use charter_llm::ProviderClient;
    use charter_llm::test_support::{MockProvider, MockReply};
    use charter_utils::types::ProjectInput;
    use std::sync::atomic::AtomicUsize;

    fn settings() -> RunSettings {
        Config::default()
            .run_settings(&RunOverrides::default())
            .unwrap()
    }

    fn coordinator(research: Arc<dyn ProviderClient>) -> ResearchCoordinator {
        let selector = ProviderSelector::new(
            Arc::new(MockProvider::new()),
            Arc::new(MockProvider::new()),
        )
        .with_research_client(research);
        ResearchCoordinator::new(Arc::new(selector))
    }

    fn health_agents() -> Vec<AgentDefinition> {
        discover(&ProjectInput::new(
            "Clinic",
            "A patient intake app for a rural health clinic",
        ))
    }

    #[tokio::test]
    async fn test_every_agent_gets_an_entry() {
        let research = Arc::new(
            MockProvider::new()
                .with_web_search()
                .with_responder(|_| MockReply::ok("### Risks\n- none found")),
        );
        let agents = health_agents();
        let brief = coordinator(research.clone())
            .execute(&RunId::from_string("r1"), &agents, "ctx", &settings(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(brief.len(), agents.len());
        assert_eq!(brief.completed_count(), agents.len());
        assert_eq!(research.call_count(), agents.len());
    }

    #[tokio::test]
    async fn test_dependents_run_after_their_dependencies() {
        let research = Arc::new(MockProvider::new().with_web_search());
        let agents = health_agents();
        let analyst = agents.iter().find(|a| !a.depends_on.is_empty()).unwrap();

        coordinator(research.clone())
            .execute(&RunId::from_string("r1"), &agents, "ctx", &settings(), &AtomicBool::new(false))
            .await
            .unwrap();

        let prompts = research.prompts();
        let position = |role: &str| {
            prompts
                .iter()
                .position(|p| p.starts_with(&format!("You are a {role} ")))
                .unwrap()
        };
        let researcher = agents.iter().find(|a| a.id == analyst.depends_on[0]).unwrap();
        assert!(position(&researcher.role) < position(&analyst.role));
    }

    #[tokio::test]
    async fn test_partial_failure_marks_agent_unavailable() {
        let research = Arc::new(MockProvider::new().with_web_search().with_responder(|prompt| {
            if prompt.contains("## Mission") {
                MockReply::ok("frameworks")
            } else {
                MockReply::err(LlmError::ProviderRejected("content policy".to_string()))
            }
        }));
        let agents = health_agents();
        let brief = coordinator(research)
            .execute(&RunId::from_string("r1"), &agents, "ctx", &settings(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(brief.completed_count(), 1);
        assert_eq!(brief.unavailable_count(), agents.len() - 1);
        assert!(brief.narrative().contains("## Unavailable Research"));
    }

    #[tokio::test]
    async fn test_first_batch_exhaustion_fails_phase() {
        let research = Arc::new(
            MockProvider::new()
                .with_web_search()
                .failing(LlmError::ProviderUnavailable("down".to_string())),
        );
        let agents = health_agents();
        let first_batch = plan_batches(&agents).unwrap()[0].len();
        let err = coordinator(research.clone())
            .execute(
                &RunId::from_string("r1"),
                &agents,
                "ctx",
                &settings(),
                &AtomicBool::new(false),
            )
            .await
            .unwrap_err();

        match err {
            PhaseError::AgentBatchExhausted { failed, reason } => {
                assert_eq!(failed, first_batch);
                assert!(reason.contains("down"));
            }
            other => panic!("Expected AgentBatchExhausted, got {other:?}"),
        }
        // Later batches never start.
        assert_eq!(research.call_count(), first_batch);
    }

    #[tokio::test]
    async fn test_cancel_before_first_batch() {
        let research = Arc::new(MockProvider::new().with_web_search());
        let err = coordinator(research.clone())
            .execute(
                &RunId::from_string("r1"),
                &[frameworks_agent()],
                "ctx",
                &settings(),
                &AtomicBool::new(true),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PhaseError::Cancelled {
                phase: ProjectPhase::Researching
            }
        ));
        assert_eq!(research.call_count(), 0);
    }

    #[tokio::test]
    async fn test_research_requires_web_search() {
        let research = Arc::new(MockProvider::new());
        let err = coordinator(research)
            .execute(
                &RunId::from_string("r1"),
                &[frameworks_agent()],
                "ctx",
                &settings(),
                &AtomicBool::new(false),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PhaseError::Provider(LlmError::Misconfiguration(_))
        ));
    }

    /// Tracks the highest number of concurrent `generate` calls.
    struct CountingProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ProviderClient for CountingProvider {
        async fn generate(&self, _prompt: &str, _params: GenerationParams) -> Result<String, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("### Precedents\n- one".to_string())
        }

        fn supports_web_search(&self) -> bool {
            true
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    /// Counts how often the selector asks whether it can search.
    struct SelectionCountingProvider {
        selections: AtomicUsize,
    }

    #[async_trait]
    impl ProviderClient for SelectionCountingProvider {
        async fn generate(&self, _prompt: &str, _params: GenerationParams) -> Result<String, LlmError> {
            Ok("### Sources\n- one".to_string())
        }

        fn supports_web_search(&self) -> bool {
            self.selections.fetch_add(1, Ordering::SeqCst);
            true
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_provider_selected_for_every_agent_call() {
        let provider = Arc::new(SelectionCountingProvider {
            selections: AtomicUsize::new(0),
        });
        let agents = health_agents();
        let batches = plan_batches(&agents).unwrap().len();
        assert!(batches > 1);

        let brief = coordinator(provider.clone())
            .execute(&RunId::from_string("r1"), &agents, "ctx", &settings(), &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(brief.completed_count(), agents.len());
        assert_eq!(provider.selections.load(Ordering::SeqCst), agents.len());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let provider = Arc::new(CountingProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let agents: Vec<AgentDefinition> = (0..6)
            .map(|i| {
                let mut agent = frameworks_agent();
                agent.id = format!("agent_{i:03}");
                agent
            })
            .collect();
        let mut settings = settings();
        settings.research_concurrency = 2;

        let brief = coordinator(provider.clone())
            .execute(&RunId::from_string("r1"), &agents, "ctx", &settings, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(brief.completed_count(), 6);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_dependency_is_invalid_graph() {
        let mut agent = frameworks_agent();
        agent.depends_on = vec!["agent_404".to_string()];
        let err = coordinator(Arc::new(MockProvider::new().with_web_search()))
            .execute(&RunId::from_string("r1"), &[agent], "ctx", &settings(), &AtomicBool::new(false))
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::InvalidAgentGraph(_)));
    }
}
