use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use charter_utils::error::PhaseError;
use charter_utils::types::{ProjectPhase, ProviderKind};

/// Mutable lifecycle of one run.
///
/// Transitions follow [`ProjectPhase::can_transition_to`]; an illegal one
/// returns `PhaseError::InvalidTransition` and changes nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub phase: ProjectPhase,
    pub created_at: DateTime<Utc>,
    pub phase_timestamps: BTreeMap<ProjectPhase, DateTime<Utc>>,
    pub error_detail: Option<String>,
    /// Backend that served the most recent successful generation call.
    pub provider: Option<ProviderKind>,
}

impl RunState {
    #[must_use]
    pub fn new(created_at: DateTime<Utc>) -> Self {
        let mut phase_timestamps = BTreeMap::new();
        phase_timestamps.insert(ProjectPhase::AgentDiscovery, created_at);
        Self {
            phase: ProjectPhase::AgentDiscovery,
            created_at,
            phase_timestamps,
            error_detail: None,
            provider: None,
        }
    }

    pub fn transition(&mut self, to: ProjectPhase) -> Result<(), PhaseError> {
        self.transition_at(to, Utc::now())
    }

    pub fn transition_at(&mut self, to: ProjectPhase, at: DateTime<Utc>) -> Result<(), PhaseError> {
        if !self.phase.can_transition_to(to) {
            return Err(PhaseError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        self.phase_timestamps.insert(to, at);
        Ok(())
    }

    /// Move to `failed` with `detail`. Terminal runs are left as they are.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), PhaseError> {
        self.transition(ProjectPhase::Failed)?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    /// When the run reached `completed` or `failed`.
    #[must_use]
    pub fn terminal_at(&self) -> Option<DateTime<Utc>> {
        self.phase
            .is_terminal()
            .then(|| self.phase_timestamps.get(&self.phase).copied())
            .flatten()
    }

    /// Time since creation, frozen once the run is terminal.
    #[must_use]
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        let end = self.terminal_at().unwrap_or(now);
        (end - self.created_at).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    fn all_phases() -> Vec<ProjectPhase> {
        ProjectPhase::iter().collect()
    }

    #[test]
    fn test_happy_path_records_every_phase() {
        let mut state = RunState::new(Utc::now());
        let mut phase = ProjectPhase::AgentDiscovery;
        while let Some(next) = phase.next() {
            state.transition(next).unwrap();
            phase = next;
        }
        assert_eq!(state.phase, ProjectPhase::Completed);
        assert_eq!(state.phase_timestamps.len(), 8);
        assert!(state.terminal_at().is_some());
    }

    #[test]
    fn test_skip_is_rejected_without_change() {
        let mut state = RunState::new(Utc::now());
        let before = state.clone();
        match state.transition(ProjectPhase::Researching) {
            Err(PhaseError::InvalidTransition { from, to }) => {
                assert_eq!(from, ProjectPhase::AgentDiscovery);
                assert_eq!(to, ProjectPhase::Researching);
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_fail_sets_detail_once() {
        let mut state = RunState::new(Utc::now());
        state.fail("privacy_review: scanner down").unwrap();
        assert_eq!(state.error_detail.as_deref(), Some("privacy_review: scanner down"));
        assert!(state.fail("again").is_err());
        assert_eq!(state.error_detail.as_deref(), Some("privacy_review: scanner down"));
    }

    #[test]
    fn test_elapsed_freezes_at_terminal() {
        let start = Utc::now();
        let mut state = RunState::new(start);
        state
            .transition_at(ProjectPhase::Failed, start + Duration::seconds(5))
            .unwrap();
        let later = start + Duration::seconds(500);
        assert_eq!(state.elapsed_at(later).as_secs(), 5);
        assert_eq!(state.elapsed_at(later + Duration::seconds(60)).as_secs(), 5);
    }

    proptest! {
        /// **Property: any sequence of attempted transitions leaves the phase
        /// history monotonic along the fixed order, with at most a final
        /// `failed`**
        #[test]
        fn prop_transitions_are_monotonic(attempts in prop::collection::vec(0usize..9, 0..40)) {
            let phases = all_phases();
            let mut state = RunState::new(Utc::now());
            let mut visited = vec![state.phase];
            for index in attempts {
                let before = state.phase;
                if state.transition(phases[index]).is_ok() {
                    prop_assert!(before.can_transition_to(state.phase));
                    visited.push(state.phase);
                } else {
                    prop_assert_eq!(state.phase, before);
                }
            }
            let (last, path) = visited.split_last().unwrap();
            for pair in path.windows(2) {
                prop_assert_eq!(pair[0].next(), Some(pair[1]));
            }
            if *last == ProjectPhase::Failed {
                prop_assert!(path.iter().all(|p| !p.is_terminal()));
            } else if let Some(prev) = path.last() {
                prop_assert_eq!(prev.next(), Some(*last));
            }
        }
    }
}
