//! Serializable structure of a machine.

use super::Visitor;
use crate::core::{State, StateLabels, Transition, TransitionLabels, Trigger};
use crate::engine::Machine;
use serde::{Deserialize, Serialize};

/// Structural snapshot of a machine's graph.
///
/// The graph never changes after it is built, so two snapshots of the same
/// machine are equal whether or not it ran in between.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub states: Vec<StateSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: String,
    pub labels: StateLabels,
    pub transitions: Vec<TransitionSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    pub target: String,
    pub trigger: Trigger,
    pub local: bool,
    pub has_effect: bool,
    pub labels: TransitionLabels,
}

impl GraphSnapshot {
    pub fn capture<D, M>(machine: &M) -> Self
    where
        D: Send + Sync + 'static,
        M: Machine<D> + ?Sized,
    {
        let mut snapshot = Self::default();
        machine.visit(&mut snapshot);
        snapshot
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<D> Visitor<D> for GraphSnapshot {
    fn visit_state(&mut self, state: &State<D>) {
        self.states.push(StateSnapshot {
            name: state.name().to_string(),
            labels: state.labels().clone(),
            transitions: Vec::new(),
        });
    }

    fn visit_transition(&mut self, transition: &Transition<D>, _source: &State<D>, target: &State<D>) {
        // Transitions always follow the state that owns them.
        if let Some(state) = self.states.last_mut() {
            state.transitions.push(TransitionSnapshot {
                target: target.name().to_string(),
                trigger: transition.trigger().clone(),
                local: transition.is_local(),
                has_effect: transition.has_effect(),
                labels: transition.labels().clone(),
            });
        }
    }
}
